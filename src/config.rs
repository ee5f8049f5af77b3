//! Choosing and configuring an engine.
//!
//! # Examples
//!
//! ```
//! use trace_trees::{config::TreeConfig, Engine};
//!
//! let config = TreeConfig::from_json(r#"{ "kind": "b-tree", "order": 4 }"#).unwrap();
//! let mut tree = config.build::<i32>().unwrap();
//!
//! for key in [10, 20, 30, 40] {
//!     tree.insert(key);
//! }
//! assert_eq!(tree.keys(), vec![10, 20, 30, 40]);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, MIN_BTREE_ORDER};
use crate::layout::LayoutConfig;
use crate::{AnyTree, Key};

/// The four engines.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TreeKind {
    /// Plain binary search tree.
    #[default]
    Bst,
    /// Height balanced tree.
    Avl,
    /// Color balanced tree.
    #[serde(alias = "rb")]
    RedBlack,
    /// Multiway balanced tree.
    #[serde(alias = "btree")]
    BTree,
}

impl TreeKind {
    /// Every kind, in a stable order.
    pub const ALL: [TreeKind; 4] = [Self::Bst, Self::Avl, Self::RedBlack, Self::BTree];

    /// The kebab-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Bst => "bst",
            Self::Avl => "avl",
            Self::RedBlack => "red-black",
            Self::BTree => "b-tree",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TreeKind {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bst" => Ok(Self::Bst),
            "avl" => Ok(Self::Avl),
            "red-black" | "rb" => Ok(Self::RedBlack),
            "b-tree" | "btree" => Ok(Self::BTree),
            _ => Err(TreeError::UnknownKind(s.to_string())),
        }
    }
}

/// Everything needed to build an [`AnyTree`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Which engine to build.
    pub kind: TreeKind,
    /// B-Tree order (maximum number of children). Ignored by binary engines.
    pub order: usize,
    /// Spacing used for snapshot coordinates.
    pub layout: LayoutConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            kind: TreeKind::default(),
            order: MIN_BTREE_ORDER,
            layout: LayoutConfig::default(),
        }
    }
}

impl TreeConfig {
    /// A default config for the given engine.
    pub fn new(kind: TreeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Parses a config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        serde_json::from_str(json).map_err(TreeError::Config)
    }

    /// Builds the configured engine. Fails only for a B-Tree order below 3.
    pub fn build<K: Key>(&self) -> Result<AnyTree<K>, TreeError> {
        AnyTree::from_config(self)
    }
}

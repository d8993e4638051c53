//! Workflows embedded in the binary and loaded by name.

use crate::config::{self, Configuration};
use crate::error::Result;

/// An embedded workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
}

impl Preset {
    pub fn configuration(&self) -> Result<Configuration> {
        config::parse(self.source)
    }
}

const PRESETS: &[Preset] = &[
    Preset {
        name: "canonical-remotes",
        description: "Point origin at the canonical GitHub owner/name",
        source: include_str!("../presets/canonical-remotes.yaml"),
    },
    Preset {
        name: "folder-names",
        description: "Fix remotes, then rename folders after their repositories",
        source: include_str!("../presets/folder-names.yaml"),
    },
    Preset {
        name: "prune-merged-branches",
        description: "Delete branches of closed pull requests",
        source: include_str!("../presets/prune-merged-branches.yaml"),
    },
    Preset {
        name: "refresh-default-branch",
        description: "Fetch and fast-forward the default branch",
        source: include_str!("../presets/refresh-default-branch.yaml"),
    },
    Preset {
        name: "ssh-remotes",
        description: "Switch HTTPS remotes to SSH",
        source: include_str!("../presets/ssh-remotes.yaml"),
    },
];

pub fn all() -> &'static [Preset] {
    PRESETS
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|preset| preset.name)
}

pub fn get(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

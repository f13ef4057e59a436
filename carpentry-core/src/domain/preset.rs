//! Shell script presets for new builders

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Script used when a builder is created without a preset or custom script
pub const DEFAULT_SCRIPT: &str = "#!/bin/bash\n\nfor x in `seq 100`; do\n    date;\n    sleep 0.1;\ndone\n";

/// Named script templates offered on the creation form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuilderPreset {
    Python,
    Ruby,
    Nodejs,
    Java,
    /// Runs longer than the server's build timeout; used to check timeouts
    TimeoutTest,
}

impl BuilderPreset {
    pub const ALL: [BuilderPreset; 5] = [
        BuilderPreset::Python,
        BuilderPreset::Ruby,
        BuilderPreset::Nodejs,
        BuilderPreset::Java,
        BuilderPreset::TimeoutTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuilderPreset::Python => "python",
            BuilderPreset::Ruby => "ruby",
            BuilderPreset::Nodejs => "nodejs",
            BuilderPreset::Java => "java",
            BuilderPreset::TimeoutTest => "timeout-test",
        }
    }

    /// The canned script for this preset
    pub fn script(self) -> &'static str {
        match self {
            BuilderPreset::Python => {
                "#!/bin/bash\nset -e\n\npip install -r requirements.txt\npython -m pytest\n"
            }
            BuilderPreset::Ruby => "#!/bin/bash\nset -e\n\nbundle install\nbundle exec rake test\n",
            BuilderPreset::Nodejs => "#!/bin/bash\nset -e\n\nnpm install\nnpm test\n",
            BuilderPreset::Java => "#!/bin/bash\nset -e\n\nmvn -B test\n",
            BuilderPreset::TimeoutTest => {
                "#!/bin/bash\n\nfor x in `seq 1000`; do\n    date;\n    sleep 1;\ndone\n"
            }
        }
    }
}

impl std::fmt::Display for BuilderPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuilderPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuilderPreset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = BuilderPreset::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown preset '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Script configuration for a builder: an optional preset plus the script text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub preset: Option<BuilderPreset>,
    pub script: String,
}

impl ScriptConfig {
    pub fn from_preset(preset: BuilderPreset) -> Self {
        Self {
            preset: Some(preset),
            script: preset.script().to_string(),
        }
    }

    pub fn custom(script: impl Into<String>) -> Self {
        Self {
            preset: None,
            script: script.into(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self::custom(DEFAULT_SCRIPT)
    }
}

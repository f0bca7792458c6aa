pub mod error;

pub use error::PipelineError;

pub mod settings {
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn default_timeout_secs() -> u64 {
        120
    }

    /// Where and how to reach the completion endpoint
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CompletionSettings {
        pub url: Option<String>,
        /// Extra request headers, e.g. {"Authorization": "Bearer ..."}
        pub headers: BTreeMap<String, String>,
        pub model: Option<String>,
        #[serde(default = "default_timeout_secs")]
        pub timeout_secs: u64,
    }

    impl Default for CompletionSettings {
        fn default() -> Self {
            Self {
                url: None,
                headers: BTreeMap::new(),
                model: None,
                timeout_secs: default_timeout_secs(),
            }
        }
    }

    /// How privileged re-runs are invoked
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ElevationSettings {
        /// Program that performs elevation and marks an already-elevated command
        pub keyword: String,
        /// Flag asking the helper to read the credential from stdin
        pub stdin_flag: String,
        /// Flags placed after `stdin_flag` (sudo's `-k` drops cached credentials)
        pub extra_flags: Vec<String>,
        /// Flag inserted when a command arrives already elevated and no credential is known
        pub non_interactive_flag: Option<String>,
        /// First-line markers of the helper's own password prompt on stderr
        pub prompt_markers: Vec<String>,
        /// Helper output meaning "I need a credential to continue"
        pub credential_required_signatures: Vec<String>,
        /// Helper output meaning "the credential was wrong"
        pub rejected_credential_signatures: Vec<String>,
    }

    impl Default for ElevationSettings {
        fn default() -> Self {
            Self {
                keyword: "sudo".into(),
                stdin_flag: "-S".into(),
                extra_flags: vec!["-k".into()],
                non_interactive_flag: Some("-n".into()),
                prompt_markers: vec!["[sudo]".into(), "password for".into()],
                credential_required_signatures: vec![
                    "a password is required".into(),
                    "a terminal is required".into(),
                ],
                rejected_credential_signatures: vec![
                    "incorrect password".into(),
                    "Sorry, try again".into(),
                    "Authentication failure".into(),
                ],
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AppSettings {
        pub completion: CompletionSettings,
        /// Single-slot file holding the last command; must already exist
        pub history_file: Option<PathBuf>,
        pub conversation_log: PathBuf,
        /// Seed message for a fresh conversation log (None = built-in prompt)
        pub system_message: Option<String>,
        /// stderr substrings that mark a failed run as a privilege denial
        pub denial_signatures: Vec<String>,
        pub elevation: ElevationSettings,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                completion: CompletionSettings::default(),
                history_file: None,
                conversation_log: PathBuf::from("messages.json"),
                system_message: None,
                denial_signatures: vec!["Permission denied".into()],
                elevation: ElevationSettings::default(),
            }
        }
    }
}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role {
        System,
        User,
        Assistant,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: Role,
        pub content: String,
    }

    impl ChatMessage {
        pub fn new(role: Role, content: impl Into<String>) -> Self {
            Self {
                role,
                content: content.into(),
            }
        }

        pub fn system(content: impl Into<String>) -> Self {
            Self::new(Role::System, content)
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self::new(Role::User, content)
        }

        pub fn assistant(content: impl Into<String>) -> Self {
            Self::new(Role::Assistant, content)
        }
    }
}

//! Label keys — the Docker label names Guerite recognizes on containers.
//!
//! All keys are configurable (§6), following the teacher's pattern of
//! centralizing every label name in one struct (`conf::MultilineConfig`)
//! rather than scattering string literals through the codebase.

#[derive(Debug, Clone)]
pub struct LabelKeys {
    pub update: String,
    pub restart: String,
    pub recreate: String,
    pub health_check: String,
    pub depends_on: String,
    pub scope: String,
    pub monitor_only: String,
    pub no_pull: String,
    pub no_restart: String,
    pub hook_pre_check: String,
    pub hook_pre_update: String,
    pub hook_post_update: String,
    pub hook_post_check: String,
    pub hook_pre_check_timeout: String,
    pub hook_pre_update_timeout: String,
    pub hook_post_update_timeout: String,
    pub hook_post_check_timeout: String,
}

impl Default for LabelKeys {
    fn default() -> Self {
        Self {
            update: "guerite.update".into(),
            restart: "guerite.restart".into(),
            recreate: "guerite.recreate".into(),
            health_check: "guerite.health_check".into(),
            depends_on: "guerite.depends_on".into(),
            scope: "guerite.scope".into(),
            monitor_only: "guerite.monitor_only".into(),
            no_pull: "guerite.no_pull".into(),
            no_restart: "guerite.no_restart".into(),
            hook_pre_check: "guerite.lifecycle.pre_check".into(),
            hook_pre_update: "guerite.lifecycle.pre_update".into(),
            hook_post_update: "guerite.lifecycle.post_update".into(),
            hook_post_check: "guerite.lifecycle.post_check".into(),
            hook_pre_check_timeout: "guerite.lifecycle.pre_check_timeout_seconds".into(),
            hook_pre_update_timeout: "guerite.lifecycle.pre_update_timeout_seconds".into(),
            hook_post_update_timeout: "guerite.lifecycle.post_update_timeout_seconds".into(),
            hook_post_check_timeout: "guerite.lifecycle.post_check_timeout_seconds".into(),
        }
    }
}

impl LabelKeys {
    /// Each key may be overridden via `GUERITE_LABEL_<SUFFIX>`.
    pub fn from_env() -> Self {
        let mut keys = Self::default();
        macro_rules! override_from_env {
            ($field:ident, $env:literal) => {
                if let Ok(v) = std::env::var($env) {
                    keys.$field = v;
                }
            };
        }
        override_from_env!(update, "GUERITE_LABEL_UPDATE");
        override_from_env!(restart, "GUERITE_LABEL_RESTART");
        override_from_env!(recreate, "GUERITE_LABEL_RECREATE");
        override_from_env!(health_check, "GUERITE_LABEL_HEALTH_CHECK");
        override_from_env!(depends_on, "GUERITE_LABEL_DEPENDS_ON");
        override_from_env!(scope, "GUERITE_LABEL_SCOPE");
        override_from_env!(monitor_only, "GUERITE_LABEL_MONITOR_ONLY");
        override_from_env!(no_pull, "GUERITE_LABEL_NO_PULL");
        override_from_env!(no_restart, "GUERITE_LABEL_NO_RESTART");
        keys
    }
}

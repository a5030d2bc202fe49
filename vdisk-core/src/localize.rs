use crate::error::StoreError;
use fluent_bundle::{FluentArgs, FluentBundle, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

const EN_GB: &str = include_str!("../i18n/en-GB.ftl");

/// Fluent-based localizer with built-in resources.
pub struct FluentLoc {
    bundle: FluentBundle<FluentResource>,
}

impl FluentLoc {
    /// Create a localizer using built-in `.ftl` strings (see ../i18n).
    /// Unknown languages fall back to en-GB.
    pub fn builtin(lang: &str) -> Self {
        let langid: LanguageIdentifier =
            lang.parse().or_else(|_| "en-GB".parse()).unwrap_or_default();

        let ftl_src = match lang {
            "en-GB" | "en" => EN_GB,
            _ => EN_GB,
        };

        let mut bundle = FluentBundle::new(vec![langid]);
        // Plain text without bidi isolation marks; output goes to terminals and tests.
        bundle.set_use_isolating(false);
        match FluentResource::try_new(ftl_src.to_owned()) {
            Ok(res) => {
                if let Err(errs) = bundle.add_resource(res) {
                    tracing::warn!(?errs, "duplicate messages in built-in resource");
                }
            }
            Err((_, errs)) => tracing::warn!(?errs, "built-in resource failed to parse"),
        }
        Self { bundle }
    }

    /// Format a message by code with named args (("name","value"), ...).
    /// Returns the code itself if not found.
    pub fn msg(&self, code: &str, args: &[(&str, &str)]) -> String {
        let Some(msg) = self.bundle.get_message(code) else {
            return code.to_string();
        };
        let Some(pattern) = msg.value() else {
            return code.to_string();
        };

        let mut fa = FluentArgs::new();
        for (k, v) in args {
            fa.set(*k, FluentValue::from(*v));
        }

        let mut errs = vec![];
        let s = self.bundle.format_pattern(pattern, Some(&fa), &mut errs).to_string();

        if errs.is_empty() {
            s
        } else {
            code.to_string()
        }
    }

    /// Human-readable text for a core error.
    pub fn error(&self, err: &StoreError) -> String {
        let owned = err.args();
        let args: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.msg(err.code(), &args)
    }
}

/// A no-op localizer you can use in tests.
pub struct NoopLoc;

impl NoopLoc {
    pub fn msg(&self, code: &str, _args: &[(&str, &str)]) -> String {
        code.to_string()
    }

    pub fn error(&self, err: &StoreError) -> String {
        err.code().to_string()
    }
}

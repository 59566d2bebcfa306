//! Localization and per-request environment.
//!
//! Every user-visible string in the engine is a translation key resolved
//! through a [`Localizer`]. The dispatcher builds one [`RequestEnv`] per
//! update from the sender's language and options.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use formbot_types::event::User;

/// Translates keys into user-facing text.
///
/// Implementations return the key itself when no translation exists, so an
/// incomplete catalog degrades to readable keys instead of failing.
pub trait Localizer: Send + Sync {
    fn tr(&self, locale: &str, key: &str) -> String;
}

/// Localizer that echoes every key back.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyLocalizer;

impl Localizer for KeyLocalizer {
    fn tr(&self, _locale: &str, key: &str) -> String {
        key.to_string()
    }
}

/// A localizer bound to one locale.
#[derive(Clone)]
pub struct LocaleContext {
    locale: String,
    localizer: Arc<dyn Localizer>,
}

impl LocaleContext {
    pub fn new(locale: impl Into<String>, localizer: Arc<dyn Localizer>) -> Self {
        Self {
            locale: locale.into(),
            localizer,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn tr(&self, key: &str) -> String {
        self.localizer.tr(&self.locale, key)
    }
}

impl std::fmt::Debug for LocaleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleContext")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

/// Free-form per-user settings loaded by an [`OptionsFetcher`].
pub type UserOptions = serde_json::Value;

/// Request-scoped environment handed to handlers, option builders, and
/// completion actions.
#[derive(Debug, Clone)]
pub struct RequestEnv {
    pub lang: LocaleContext,
    pub options: UserOptions,
}

impl RequestEnv {
    pub fn new(lang: LocaleContext, options: UserOptions) -> Self {
        Self { lang, options }
    }
}

/// Loads the locale and options of the user behind an update.
pub trait OptionsFetcher: Send + Sync {
    /// Returns `(locale, options)` for `user`.
    fn fetch_user_options<'a>(&'a self, user: &'a User) -> BoxFuture<'a, (String, UserOptions)>;
}

/// Picks the user's client language when it is supported, otherwise the
/// default locale. Carries no options.
#[derive(Debug, Clone)]
pub struct LanguageOptionsFetcher {
    default_locale: String,
    supported: Vec<String>,
}

impl LanguageOptionsFetcher {
    pub fn new(default_locale: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            supported,
        }
    }

    fn resolve(&self, user: &User) -> String {
        user.language_code
            .as_deref()
            .map(|code| code.split(['-', '_']).next().unwrap_or(code))
            .filter(|code| self.supported.iter().any(|s| s == code))
            .map(str::to_string)
            .unwrap_or_else(|| self.default_locale.clone())
    }
}

impl OptionsFetcher for LanguageOptionsFetcher {
    fn fetch_user_options<'a>(&'a self, user: &'a User) -> BoxFuture<'a, (String, UserOptions)> {
        let locale = self.resolve(user);
        Box::pin(async move { (locale, serde_json::Value::Null) })
    }
}

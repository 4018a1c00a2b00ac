use std::{fmt::Display, io::IsTerminal, sync::LazyLock};

use anstyle::{AnsiColor, Style};

/// A set of styles for the pieces of taskdue's output.
///
/// When the output isn't a terminal, or colors are disabled via `NO_COLOR`
/// or `TERM=dumb`, every style is empty.
#[derive(Clone, Debug)]
pub struct Theme {
    inner: Option<ThemeInner>,
}

impl Theme {
    /// Returns a theme for stderr.
    pub fn stderr() -> &'static Theme {
        static THEME: LazyLock<Theme> = LazyLock::new(|| {
            if !std::io::stderr().is_terminal() || !can_use_colors() {
                return Theme { inner: None };
            }
            Theme { inner: Some(ThemeInner::default()) }
        });
        &*THEME
    }

    pub fn highlight<T: Display>(&self, data: T) -> Styled<'_, T> {
        let style = self.inner.as_ref().map(|inner| &inner.highlight);
        Styled { data, style }
    }

    /// Styles a log level according to its severity.
    pub fn level(&self, level: log::Level) -> Styled<'_, log::Level> {
        let style = self.inner.as_ref().and_then(|inner| match level {
            log::Level::Error => Some(&inner.error),
            log::Level::Warn => Some(&inner.warn),
            _ => None,
        });
        Styled { data: level, style }
    }
}

#[derive(Clone, Debug)]
struct ThemeInner {
    highlight: Style,
    warn: Style,
    error: Style,
}

impl Default for ThemeInner {
    fn default() -> ThemeInner {
        ThemeInner {
            highlight: Style::new()
                .bold()
                .fg_color(Some(AnsiColor::Magenta.into())),
            warn: Style::new().fg_color(Some(AnsiColor::Yellow.into())),
            error: Style::new().bold().fg_color(Some(AnsiColor::Red.into())),
        }
    }
}

/// A possibly unstyled piece of renderable data.
#[derive(Clone, Debug)]
pub struct Styled<'s, T> {
    data: T,
    style: Option<&'s Style>,
}

impl<'s, T: Display> Display for Styled<'s, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let Some(style) = self.style else {
            return self.data.fmt(f);
        };
        write!(f, "{style}{}{style:#}", self.data)
    }
}

/// Whether colors have been globally disabled or not.
fn can_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        return false;
    }
    std::env::var_os("TERM").map_or(true, |v| v != "dumb")
}

//! ---
//! acm_section: "03-logging"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Structured logging adapters and the policy logger sink."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
/// Emit an informational log enriched with assertion context.
#[macro_export]
macro_rules! acm_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            section = ctx.section.unwrap_or(""),
            ptype = ctx.ptype.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            rules = ctx.rules.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(
            tracing::Level::INFO,
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with assertion context.
#[macro_export]
macro_rules! acm_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            section = ctx.section.unwrap_or(""),
            ptype = ctx.ptype.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            rules = ctx.rules.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(
            tracing::Level::DEBUG,
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with assertion context.
#[macro_export]
macro_rules! acm_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            section = ctx.section.unwrap_or(""),
            ptype = ctx.ptype.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            rules = ctx.rules.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(
            tracing::Level::ERROR,
            message = %format_args!($($arg)+)
        );
    }};
}

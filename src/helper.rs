use crate::AtomicFixedString;

pub trait ErrorLogFormat {
    fn fmt_error(&self) -> AtomicFixedString;
}
impl<E: std::error::Error + Send + Sync + 'static> ErrorLogFormat for error_stack::Report<E> {
    fn fmt_error(&self) -> AtomicFixedString {
        format!("\n{self:?}\n").into()
    }
}

pub fn time_log_fmt() -> impl time::formatting::Formattable {
    time::macros::format_description!(
        "[year]-[month padding:zero]-[day padding:zero] [hour]:[minute]:[second].[subsecond digits:3]"
    )
}

/// Read an optional override from the process environment, skipping unset and
/// empty variables.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

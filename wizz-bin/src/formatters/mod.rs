pub(crate) mod log;
pub(crate) mod output;

pub(crate) mod attempt;
pub(crate) mod catalog;
pub(crate) mod content;
pub(crate) mod scoring;
pub(crate) mod timer;

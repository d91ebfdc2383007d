pub mod binarize;
pub mod compute;
pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod moments;
pub mod pipeline;

pub mod cli;
pub mod io;
pub mod model;
pub mod timeline;
pub mod tui;
pub mod util;

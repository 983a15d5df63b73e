mod assets;
mod page;
mod root;

pub use assets::AssetsCommand;
pub use page::PageCommand;
pub use root::Cli;

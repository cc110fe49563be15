pub mod deps;
pub mod load;
pub mod locate;

pub use deps::*;
pub use load::*;
pub use locate::*;

mod account;
mod availability;
mod confidence;
mod household;
mod intelligence;
mod money;
mod recommendation;
mod subscription;
mod title;
mod viewing_record;

pub use account::*;
pub use availability::*;
pub use confidence::*;
pub use household::*;
pub use intelligence::*;
pub use money::*;
pub use recommendation::*;
pub use subscription::*;
pub use title::*;
pub use viewing_record::*;

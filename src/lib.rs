pub mod bag;
pub mod config;
pub mod exception;
pub mod input;
pub mod param;
pub mod request;
pub mod response;
pub mod scope;
pub mod uri;
pub mod util;

pub use bag::{Bag, BagKind, FilesBag, HeadersBag, InputBag, ServerBag};
pub use config::Config;
pub use exception::{Exception, InputError, ScopeError};
pub use input::InputAccessor;
pub use param::HttpVersion;
pub use request::{ServerRequest, UploadedFile};
pub use response::Response;
pub use scope::{RequestScope, ScopeGuard, ScopeProvider, ScopedRequest};
pub use uri::Uri;
pub use util::HtmlBuilder;

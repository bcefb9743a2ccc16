//! Capture of one exchange: the per-exchange [`Context`], the request body
//! interceptor, and the response peek filter.

mod context;
mod request;
mod response;
mod stream;

pub use context::{check_property_name, Context, ReservedKey};
pub use request::{CaptureBuffer, RequestBodyCapture, Sink, WriterContext, WriterInterceptor};
pub use response::ResponsePeekFilter;
pub use stream::{BytesStream, EntityStream, ReplayReader};

pub mod request_id;

pub use request_id::{correlation_id, CorrelationId, RequestId, CORRELATION_HEADER};

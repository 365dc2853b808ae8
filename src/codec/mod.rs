//! Serialization codec
//!
//! Converts items and envelopes to and from the wire forms the backends
//! store:
//!
//! - [`series`]: series <-> JSON text (columns orient)
//! - [`model`]: model records <-> JSON text with tagged substructures
//! - [`envelope`]: metadata envelopes <-> JSON object of scalars
//! - [`columnar`]: series and models <-> Arrow record batches
//!
//! Every pair satisfies `decode(encode(x)) == x`: value-wise and
//! timestamp-exact for series, structurally (key order included) for models.

pub mod columnar;
pub mod envelope;
pub mod model;
pub mod series;

pub use envelope::{decode_metadata, encode_metadata, ORIGIN_SHAPE_KEY};
pub use model::{decode_model, encode_model};
pub use series::{decode_series, encode_series};

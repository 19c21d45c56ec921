//! Entity extraction backed by the Calais tagging service, live or from saved responses.

pub mod calais;

pub use calais::{parse_calais_response, response_path, CachedResponseExtractor, CalaisClient, CalaisExtractor, CALAIS_URL};

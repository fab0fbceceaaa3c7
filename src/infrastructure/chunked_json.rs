// Chunked JSON streaming utilities
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncReadExt;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
pub const FRAMED_CONTENT_TYPE: &str = "application/x-dashboard-frames";

/// Stream each item as one chunk.
///
/// Uncompressed chunks are newline-delimited JSON. Compressed chunks are each
/// Brotli-compressed on their own and prefixed with a 4-byte big-endian
/// length; no `Content-Encoding` is set since the HTTP body itself is not
/// one compressed stream.
pub fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let byte_stream = stream.then(move |item| encode_chunk(item, compress));
    let content_type = if compress {
        FRAMED_CONTENT_TYPE
    } else {
        NDJSON_CONTENT_TYPE
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn encode_chunk<T: Serialize>(item: T, compress: bool) -> Result<Bytes, std::io::Error> {
    let mut json = serde_json::to_vec(&item)?;

    if !compress {
        json.push(b'\n');
        return Ok(Bytes::from(json));
    }

    let mut encoder = BrotliEncoder::new(std::io::Cursor::new(json));
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;

    let mut chunk = BytesMut::with_capacity(4 + compressed.len());
    chunk.put_u32(compressed.len() as u32);
    chunk.put_slice(&compressed);
    Ok(chunk.freeze())
}

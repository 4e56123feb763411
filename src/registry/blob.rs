//! Blob downloads, including the hop to pre-signed storage URLs
//!
//! Registries commonly answer a blob request with a redirect to a storage
//! host. The redirect target is pre-authorized by its own query string and
//! must be fetched without our bearer token; some storage servers reject
//! requests that carry an extra `Authorization` header.

use crate::errors::ImageError;
use reqwest::{header, Request, StatusCode};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Default limit on redirects followed for one blob
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Outcome of a single blob request
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Download {
    /// The body was written out, this many bytes
    Complete(u64),
    /// Nothing was written; ask this URL instead
    Redirect(Url),
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Perform one request, streaming a `200` body into a new file at `dest`
///
/// Redirects are returned to the caller without reading the body. Any other
/// status is an error, and leaves `dest` untouched.
pub async fn download_file(
    req: &reqwest::Client,
    request: Request,
    dest: &Path,
) -> Result<Download, ImageError> {
    let url = request.url().clone();
    let mut response = req.execute(request).await?;
    let status = response.status();

    if is_redirect(status) {
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ImageError::MissingRedirectLocation(url.clone()))?;
        let target = url
            .join(location)
            .map_err(|_| ImageError::MissingRedirectLocation(url.clone()))?;
        return Ok(Download::Redirect(target));
    }
    if status != StatusCode::OK {
        return Err(ImageError::UnexpectedStatus { status, url });
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut size = 0u64;
    let result: Result<(), ImageError> = loop {
        match response.chunk().await {
            Err(err) => break Err(err.into()),
            Ok(None) => break file.flush().await.map_err(Into::into),
            Ok(Some(chunk)) => match file.write_all(&chunk).await {
                Err(err) => break Err(err.into()),
                Ok(()) => size += chunk.len() as u64,
            },
        }
    };
    if let Err(err) = result {
        drop(file);
        return Err(discard_partial(dest, err).await);
    }
    Ok(Download::Complete(size))
}

/// Remove a partly written download, keeping the error that interrupted it
async fn discard_partial(dest: &Path, err: ImageError) -> ImageError {
    if let Err(remove_err) = tokio::fs::remove_file(dest).await {
        log::warn!("failed to remove partial download {:?}: {}", dest, remove_err);
    }
    err
}

/// Download a blob to `dest`, following up to `max_redirects` redirects
///
/// The first request is sent as given (usually with a bearer token). Every
/// redirect target gets a fresh, unauthenticated GET.
pub async fn fetch_blob(
    req: &reqwest::Client,
    request: Request,
    dest: &Path,
    max_redirects: usize,
) -> Result<u64, ImageError> {
    let mut hops = 0;
    let mut outcome = download_file(req, request, dest).await?;
    loop {
        match outcome {
            Download::Complete(size) => return Ok(size),
            Download::Redirect(target) => {
                if hops >= max_redirects {
                    return Err(ImageError::RedirectLoop {
                        limit: max_redirects,
                    });
                }
                hops += 1;
                log::debug!(
                    "redirect {} to {}",
                    hops,
                    target.host_str().unwrap_or("<no host>")
                );
                log::trace!("redirect target {}", target);
                let request = req.get(target).build()?;
                outcome = download_file(req, request, dest).await?;
            }
        }
    }
}

//! Admin gallery: paginated listing and deletion

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use edge_response_cache::ResponseCache;
use filebed_db::{media, MediaPage, MediaRow, SortOrder, SqlitePool};
use telegram_blob_relay::{content_type_for, MediaKind};
use tracing::{info, warn};

use crate::pages::escape_html;

pub const PAGE_SIZE: u32 = 50;

pub struct GalleryAdmin {
    pool: SqlitePool,
    cache: Arc<ResponseCache>,
    origin: String,
    page_size: u32,
}

impl GalleryAdmin {
    pub fn new(pool: SqlitePool, cache: Arc<ResponseCache>, origin: &str) -> Self {
        Self {
            pool,
            cache,
            origin: origin.to_string(),
            page_size: PAGE_SIZE,
        }
    }

    pub async fn list(&self, page: u32, order: SortOrder) -> Result<MediaPage, sqlx::Error> {
        media::list_page(&self.pool, page, self.page_size, order).await
    }

    /// Remove the records for `entries` and purge their cached responses.
    ///
    /// Entries may be bare keys or full public URLs. Unknown keys are
    /// ignored. The rows are gone once this returns; a failed purge only
    /// leaves a stale cached copy until its TTL runs out.
    pub async fn delete(&self, entries: &[String]) -> Result<u64, sqlx::Error> {
        let keys: BTreeSet<String> = entries.iter().filter_map(|e| key_from_entry(e)).collect();
        let deleted = media::delete_many(&self.pool, &keys).await?;
        info!(requested = keys.len(), deleted, "Deleted media records");

        for key in &keys {
            let url = format!("{}/{}", self.origin, key);
            if let Err(e) = self.cache.invalidate(&url).await {
                warn!(url = %url, error = %e, "Cache purge failed; entry stays until TTL expiry");
            }
        }

        Ok(deleted)
    }
}

/// `https://host/1700000000000.png?x=1` and `/1700000000000.png` both yield the key
fn key_from_entry(entry: &str) -> Option<String> {
    let entry = entry.trim();
    let path = match url::Url::parse(entry) {
        Ok(url) if url.has_host() => url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string)),
        _ => {
            let bare = entry.split(['?', '#']).next().unwrap_or_default();
            bare.rsplit('/').find(|s| !s.is_empty()).map(str::to_string)
        }
    }?;

    let key = urlencoding::decode(&path).map(|k| k.into_owned()).unwrap_or(path);
    (!key.is_empty()).then_some(key)
}

/// Render one gallery page
pub fn render_page(page: &MediaPage, order: SortOrder, admin_path: &str, origin: &str) -> String {
    let order_param = match order {
        SortOrder::Newest => "desc",
        SortOrder::Oldest => "asc",
    };

    let mut html = String::new();
    html.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
        "<meta charset=\"UTF-8\">\n",
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        "<title>Gallery</title>\n<style>\n",
        "body { font-family: system-ui, sans-serif; margin: 1rem; }\n",
        ".grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 1rem; }\n",
        ".item { border: 1px solid #ddd; border-radius: 6px; padding: 0.5rem; font-size: 0.8rem; word-break: break-all; }\n",
        ".item img, .item video { width: 100%; height: 160px; object-fit: cover; }\n",
        ".file { height: 160px; display: flex; align-items: center; justify-content: center; background: #f3f3f3; }\n",
        ".pager a { margin: 0 0.3rem; }\n",
        "</style>\n</head>\n<body>\n",
    ));

    let _ = write!(
        html,
        "<h1>Gallery</h1>\n<p>{} files, page {} of {}. <a href=\"/{}?page=1&amp;order={}\">Show {}</a></p>\n",
        page.total_count,
        page.page,
        page.total_pages.max(1),
        escape_html(admin_path),
        if order == SortOrder::Newest { "asc" } else { "desc" },
        if order == SortOrder::Newest { "oldest first" } else { "newest first" },
    );
    html.push_str("<p><button id=\"delete\">Delete selected</button></p>\n<div class=\"grid\">\n");

    for record in &page.records {
        render_item(&mut html, record, origin);
    }
    html.push_str("</div>\n");

    render_pager(&mut html, page, admin_path, order_param);

    html.push_str(concat!(
        "<script>\n",
        "document.getElementById('delete').onclick = async () => {\n",
        "  const keys = [...document.querySelectorAll('input.pick:checked')].map((c) => c.value);\n",
        "  if (!keys.length || !confirm('Delete ' + keys.length + ' file(s)?')) return;\n",
        "  const response = await fetch('/delete-images', {\n",
        "    method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(keys)\n",
        "  });\n",
        "  const body = await response.json();\n",
        "  if (response.ok) { alert('Deleted ' + body.deleted); location.reload(); }\n",
        "  else { alert(body.error || response.statusText); }\n",
        "};\n",
        "</script>\n</body>\n</html>\n",
    ));
    html
}

fn render_item(html: &mut String, record: &MediaRow, origin: &str) {
    let key = escape_html(&record.key);
    let url = format!("{}/{}", escape_html(origin), key);
    let uploaded = record
        .created_at_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let preview = match MediaKind::of(content_type_for(&record.extension)) {
        MediaKind::Image => format!("<img src=\"{}\" loading=\"lazy\" alt=\"{}\">", url, key),
        MediaKind::Video => format!("<video src=\"{}\" controls preload=\"metadata\"></video>", url),
        MediaKind::Other => format!("<div class=\"file\">.{}</div>", escape_html(&record.extension)),
    };

    let _ = write!(
        html,
        "<div class=\"item\">{}<label><input type=\"checkbox\" class=\"pick\" value=\"{}\"> <a href=\"{}\" target=\"_blank\">{}</a></label><br>{} &middot; {} bytes</div>\n",
        preview, key, url, key, uploaded, record.size_bytes
    );
}

fn render_pager(html: &mut String, page: &MediaPage, admin_path: &str, order_param: &str) {
    if page.total_pages <= 1 {
        return;
    }
    let admin_path = escape_html(admin_path);
    let link = |n: u32, label: &str| {
        format!(
            "<a href=\"/{}?page={}&amp;order={}\">{}</a>",
            admin_path, n, order_param, label
        )
    };

    html.push_str("<p class=\"pager\">");
    if page.page > 1 {
        html.push_str(&link(page.page - 1, "&laquo; Prev"));
    }
    for n in 1..=page.total_pages {
        if n == page.page {
            let _ = write!(html, "<strong>{}</strong>", n);
        } else {
            html.push_str(&link(n, &n.to_string()));
        }
    }
    if page.page < page.total_pages {
        html.push_str(&link(page.page + 1, "Next &raquo;"));
    }
    html.push_str("</p>\n");
}

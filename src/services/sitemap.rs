//! `sitemap.xml` and `robots.txt`.

use chrono::{DateTime, Utc};

use crate::models::{Content, ContentKind, Product};

/// Escape the characters XML reserves in text and attribute values.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Public path of a content detail page
pub fn content_path(kind: ContentKind, slug: &str) -> String {
    format!("/{}/{}", kind.route_slug(), urlencoding::encode(slug))
}

struct Entry {
    loc: String,
    lastmod: Option<DateTime<Utc>>,
}

/// Render the urlset for the home page, every list page, every published
/// content row and every active product.
pub fn build_sitemap(site_url: &str, contents: &[Content], products: &[Product]) -> String {
    let base = site_url.trim_end_matches('/');
    let mut entries = vec![Entry {
        loc: format!("{}/", base),
        lastmod: None,
    }];

    entries.extend(ContentKind::ALL.iter().map(|kind| Entry {
        loc: format!("{}/{}", base, kind.route_slug()),
        lastmod: None,
    }));
    entries.extend(contents.iter().filter(|c| c.is_published()).map(|c| Entry {
        loc: format!("{}{}", base, content_path(c.kind, &c.slug)),
        lastmod: Some(c.updated_at),
    }));

    entries.push(Entry {
        loc: format!("{}/shop", base),
        lastmod: None,
    });
    entries.extend(products.iter().filter(|p| p.active).map(|p| Entry {
        loc: format!("{}/shop/products/{}", base, p.id),
        lastmod: Some(p.updated_at),
    }));

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&xml_escape(&entry.loc));
        xml.push_str("</loc>\n");
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod.format("%Y-%m-%d")));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(site_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
        site_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PublishStatus;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn content(slug: &str, status: PublishStatus) -> Content {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        Content {
            id: 1,
            kind: ContentKind::Sermon,
            slug: slug.to_string(),
            title: "T".to_string(),
            summary: String::new(),
            body: String::new(),
            body_html: String::new(),
            category: String::new(),
            author_name: String::new(),
            media_url: None,
            thumbnail: None,
            publish_status: status,
            view_count: 0,
            published_at: Some(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_sitemap_lists_published_only() {
        let xml = build_sitemap(
            "https://minbar.example/",
            &[content("friday-khutbah", PublishStatus::Published), content("draft", PublishStatus::Draft)],
            &[],
        );

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://minbar.example/</loc>"));
        assert!(xml.contains("<loc>https://minbar.example/sermons</loc>"));
        assert!(xml.contains("<loc>https://minbar.example/sermons/friday-khutbah</loc>"));
        assert!(xml.contains("<lastmod>2024-03-10</lastmod>"));
        assert!(xml.contains("<loc>https://minbar.example/shop</loc>"));
        assert!(!xml.contains("/sermons/draft"));
    }

    #[test]
    fn test_sitemap_encodes_arabic_slug() {
        let xml = build_sitemap("https://m.example", &[content("خطبة", PublishStatus::Published)], &[]);
        assert!(xml.contains("/sermons/%D8%AE%D8%B7%D8%A8%D8%A9</loc>"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_robots() {
        let robots = robots_txt("https://minbar.example/");
        assert!(robots.contains("Sitemap: https://minbar.example/sitemap.xml"));
        assert!(robots.contains("Disallow: /api/"));
    }

    proptest! {
        #[test]
        fn escaped_text_has_no_markup(s in "\\PC{0,64}") {
            let escaped = xml_escape(&s);
            prop_assert!(!escaped.contains('<'));
            prop_assert!(!escaped.contains('>'));
            prop_assert!(!escaped.contains('"'));
            let unescaped = escaped
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&quot;", "\"")
                .replace("&apos;", "'")
                .replace("&amp;", "&");
            prop_assert_eq!(unescaped, s);
        }
    }
}

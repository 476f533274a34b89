//! Container pointer and package document resolution
//!
//! An unpacked EPUB tree is turned into a [`Book`] in two steps: the fixed
//! pointer file `META-INF/container.xml` names the package document, and the
//! package document (OPF) supplies metadata plus the manifest/spine pair
//! that yields the reading order. Element name matching tolerates both bare
//! and namespaced forms (`title` and `dc:title` are the same element here).

use crate::error::PackageError;
use crate::types::{Book, BookMetadata, Page};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Result type for package resolution
pub type PackageResult<T> = std::result::Result<T, PackageError>;

/// Fixed location of the container pointer file
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parsed OPF content
struct OpfData {
    metadata: BookMetadata,
    /// Maps manifest id -> href
    manifest: HashMap<String, String>,
    spine_ids: Vec<String>,
}

/// Build a [`Book`] from an unpacked EPUB tree rooted at `root`.
///
/// Unresolvable spine references and unreadable content files are logged
/// and skipped; a missing or empty pointer file and an unreadable package
/// document are fatal.
pub fn resolve_book(source_path: &Path, root: &Path) -> PackageResult<Book> {
    let container_path = root.join(CONTAINER_PATH);
    if !container_path.is_file() {
        return Err(PackageError::MissingContainer(
            container_path.display().to_string(),
        ));
    }

    let container_xml = fs::read_to_string(&container_path)?;
    let opf_href = find_opf_path(strip_bom(&container_xml))?;

    let opf_rel = resolve_href(Path::new(""), &opf_href).ok_or_else(|| {
        PackageError::InvalidContainer(format!(
            "package document path escapes the archive root: {opf_href}"
        ))
    })?;
    let opf_content = fs::read_to_string(root.join(&opf_rel)).map_err(|e| {
        PackageError::InvalidContainer(format!(
            "cannot read package document {}: {e}",
            opf_rel.display()
        ))
    })?;
    let opf_dir = opf_rel.parent().unwrap_or_else(|| Path::new(""));

    let OpfData {
        metadata,
        manifest,
        spine_ids,
    } = parse_opf(strip_bom(&opf_content))?;

    tracing::debug!(
        title = %metadata.title,
        manifest_items = manifest.len(),
        spine_refs = spine_ids.len(),
        "resolved package document"
    );

    let mut book = Book::new(source_path, metadata);
    for idref in &spine_ids {
        let Some(href) = manifest.get(idref) else {
            tracing::warn!(idref = %idref, "spine reference not found in manifest, skipping");
            continue;
        };
        let Some(page_rel) = resolve_href(opf_dir, href) else {
            tracing::warn!(href = %href, "content path escapes the archive root, skipping");
            continue;
        };
        let content = match fs::read_to_string(root.join(&page_rel)) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %page_rel.display(), error = %e, "cannot read content file, skipping");
                continue;
            }
        };

        let order = book.total_pages() + 1;
        let title = page_rel
            .file_stem()
            .and_then(|s| s.to_str())
            .map(String::from)
            .unwrap_or_else(|| format!("Chapter {order}"));
        book.add_page(Page::new(rel_name(&page_rel), order, title, content));
    }

    Ok(book)
}

/// Extract the package document path from the container pointer file
fn find_opf_path(container_xml: &str) -> PackageResult<String> {
    let mut reader = Reader::from_str(container_xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PackageError::Xml(e)),
            _ => {}
        }
    }

    Err(PackageError::InvalidContainer(
        "no rootfile entry in container.xml".into(),
    ))
}

fn parse_opf(content: &str) -> PackageResult<OpfData> {
    let mut reader = Reader::from_str(content);

    let mut metadata = BookMetadata::new("", "");
    let mut manifest: HashMap<String, String> = HashMap::new();
    let mut spine_ids: Vec<String> = Vec::new();

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"metadata" => in_metadata = true,
                b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                | b"description" => {
                    if in_metadata {
                        current_element = Some(
                            String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned(),
                        );
                        buf_text.clear();
                    }
                }
                b"item" => collect_item(&e, &mut manifest),
                b"itemref" => collect_itemref(&e, &mut spine_ids),
                _ => {}
            },
            Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"item" => collect_item(&e, &mut manifest),
                b"itemref" => collect_itemref(&e, &mut spine_ids),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == b"metadata" {
                    in_metadata = false;
                }
                if let Some(ref elem) = current_element {
                    let text = buf_text.trim();
                    if !text.is_empty() {
                        match elem.as_str() {
                            "title" => {
                                if metadata.title.is_empty() {
                                    metadata.title = text.to_string();
                                }
                            }
                            "creator" => metadata.authors.push(text.to_string()),
                            "language" => metadata.language = text.to_string(),
                            "identifier" => {
                                if metadata.identifier.is_none() {
                                    metadata.identifier = Some(text.to_string());
                                }
                            }
                            "publisher" => metadata.publisher = Some(text.to_string()),
                            "description" => metadata.description = Some(text.to_string()),
                            _ => {}
                        }
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PackageError::Xml(e)),
            _ => {}
        }
    }

    if metadata.title.is_empty() {
        metadata.title = "Unknown Title".to_string();
    }
    if metadata.authors.is_empty() {
        metadata.authors.push("Unknown Author".to_string());
    }
    if metadata.language.is_empty() {
        metadata.language = "en".to_string();
    }

    Ok(OpfData {
        metadata,
        manifest,
        spine_ids,
    })
}

fn collect_item(e: &quick_xml::events::BytesStart<'_>, manifest: &mut HashMap<String, String>) {
    let mut id = String::new();
    let mut href = String::new();
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => id = String::from_utf8_lossy(&attr.value).into_owned(),
            b"href" => href = String::from_utf8_lossy(&attr.value).into_owned(),
            _ => {}
        }
    }
    if !id.is_empty() && !href.is_empty() {
        manifest.insert(id, href);
    }
}

fn collect_itemref(e: &quick_xml::events::BytesStart<'_>, spine_ids: &mut Vec<String>) {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"idref" {
            spine_ids.push(String::from_utf8_lossy(&attr.value).into_owned());
        }
    }
}

/// Element name with any namespace prefix stripped
fn local_name(name: &[u8]) -> &[u8] {
    name.rsplit(|&b| b == b':').next().unwrap_or(name)
}

/// Drop a leading UTF-8 byte order mark
fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

/// Resolve `href` against `base` and normalize it, refusing to escape the
/// archive root. `..` components pop; popping past the root means escape.
fn resolve_href(base: &Path, href: &str) -> Option<PathBuf> {
    let href = href.split('#').next().unwrap_or(href);
    let mut stack: Vec<std::ffi::OsString> = Vec::new();
    for component in base.join(href).components() {
        match component {
            Component::Normal(c) => stack.push(c.to_os_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if stack.is_empty() {
        return None;
    }
    Some(stack.iter().collect())
}

/// Forward-slash form of a relative path, used as the Page identifier
fn rel_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const OPF_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>The Time Machine</dc:title>
    <dc:creator>H. G. Wells</dc:creator>
    <dc:language>en</dc:language>
    <dc:publisher>William Heinemann</dc:publisher>
    <dc:identifier>978-0-553-21351-0</dc:identifier>
  </metadata>
  <manifest>
    <item id="ch1" href="ch01.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="ch02.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

    fn write_fixture(root: &Path) {
        fs::create_dir_all(root.join("META-INF")).unwrap();
        fs::write(root.join(CONTAINER_PATH), CONTAINER_XML).unwrap();
        fs::create_dir_all(root.join("OEBPS")).unwrap();
        fs::write(root.join("OEBPS/content.opf"), OPF_XML).unwrap();
        fs::write(root.join("OEBPS/ch01.xhtml"), "<p>Chapter one.</p>").unwrap();
        fs::write(root.join("OEBPS/ch02.xhtml"), "<p>Chapter two.</p>").unwrap();
        fs::write(root.join("OEBPS/style.css"), "p { margin: 0 }").unwrap();
    }

    #[test]
    fn test_resolve_book() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());

        let book = resolve_book(Path::new("/books/time-machine.epub"), dir.path()).unwrap();
        assert_eq!(book.metadata().title, "The Time Machine");
        assert_eq!(book.metadata().primary_author(), Some("H. G. Wells"));
        assert_eq!(book.metadata().language, "en");
        assert_eq!(
            book.metadata().identifier.as_deref(),
            Some("978-0-553-21351-0")
        );

        assert_eq!(book.total_pages(), 2);
        let pages = book.pages();
        assert_eq!(pages[0].id(), "OEBPS/ch01.xhtml");
        assert_eq!(pages[0].order(), 1);
        assert_eq!(pages[0].title(), "ch01");
        assert_eq!(pages[0].content(), "<p>Chapter one.</p>");
        assert_eq!(pages[1].id(), "OEBPS/ch02.xhtml");
        assert_eq!(pages[1].order(), 2);
    }

    #[test]
    fn test_bare_element_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(
            dir.path().join(CONTAINER_PATH),
            r#"<container><rootfiles><rootfile full-path="content.opf"/></rootfiles></container>"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("content.opf"),
            r#"<package>
  <metadata>
    <title>Plain Names</title>
    <creator>A. Nonymous</creator>
    <language>fr</language>
  </metadata>
  <manifest><item id="p1" href="page.xhtml"/></manifest>
  <spine><itemref idref="p1"/></spine>
</package>"#,
        )
        .unwrap();
        fs::write(dir.path().join("page.xhtml"), "<p>Bonjour</p>").unwrap();

        let book = resolve_book(Path::new("plain.epub"), dir.path()).unwrap();
        assert_eq!(book.metadata().title, "Plain Names");
        assert_eq!(book.metadata().primary_author(), Some("A. Nonymous"));
        assert_eq!(book.metadata().language, "fr");
        assert_eq!(book.pages()[0].id(), "page.xhtml");
    }

    #[test]
    fn test_metadata_defaults_applied() {
        let data = parse_opf(
            r#"<package><metadata></metadata>
               <manifest/><spine/></package>"#,
        )
        .unwrap();
        assert_eq!(data.metadata.title, "Unknown Title");
        assert_eq!(data.metadata.primary_author(), Some("Unknown Author"));
        assert_eq!(data.metadata.language, "en");
    }

    #[test]
    fn test_missing_container_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_book(Path::new("x.epub"), dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::MissingContainer(_)));
    }

    #[test]
    fn test_container_without_rootfile() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(
            dir.path().join(CONTAINER_PATH),
            "<container><rootfiles/></container>",
        )
        .unwrap();

        let err = resolve_book(Path::new("x.epub"), dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::InvalidContainer(_)));
    }

    #[test]
    fn test_unreadable_package_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(dir.path().join(CONTAINER_PATH), CONTAINER_XML).unwrap();

        let err = resolve_book(Path::new("x.epub"), dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::InvalidContainer(_)));
    }

    #[test]
    fn test_unknown_spine_reference_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let opf = OPF_XML.replace(
            r#"<itemref idref="ch2"/>"#,
            r#"<itemref idref="ghost"/><itemref idref="ch2"/>"#,
        );
        fs::write(dir.path().join("OEBPS/content.opf"), opf).unwrap();

        let book = resolve_book(Path::new("x.epub"), dir.path()).unwrap();
        assert_eq!(book.total_pages(), 2);
        assert_eq!(book.pages()[1].id(), "OEBPS/ch02.xhtml");
        assert_eq!(book.pages()[1].order(), 2);
    }

    #[test]
    fn test_missing_content_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        fs::remove_file(dir.path().join("OEBPS/ch01.xhtml")).unwrap();

        let book = resolve_book(Path::new("x.epub"), dir.path()).unwrap();
        assert_eq!(book.total_pages(), 1);
        assert_eq!(book.pages()[0].id(), "OEBPS/ch02.xhtml");
        assert_eq!(book.pages()[0].order(), 1);
    }

    #[test]
    fn test_href_with_parent_dir_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let opf = OPF_XML.replace("href=\"ch01.xhtml\"", "href=\"../shared/ch01.xhtml\"");
        fs::write(dir.path().join("OEBPS/content.opf"), opf).unwrap();
        fs::create_dir_all(dir.path().join("shared")).unwrap();
        fs::write(dir.path().join("shared/ch01.xhtml"), "<p>Shared.</p>").unwrap();

        let book = resolve_book(Path::new("x.epub"), dir.path()).unwrap();
        assert_eq!(book.pages()[0].id(), "shared/ch01.xhtml");
        assert_eq!(book.pages()[0].content(), "<p>Shared.</p>");
    }

    #[test]
    fn test_href_escaping_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let opf = OPF_XML.replace("href=\"ch01.xhtml\"", "href=\"../../outside.xhtml\"");
        fs::write(dir.path().join("OEBPS/content.opf"), opf).unwrap();

        let book = resolve_book(Path::new("x.epub"), dir.path()).unwrap();
        assert_eq!(book.total_pages(), 1);
        assert_eq!(book.pages()[0].id(), "OEBPS/ch02.xhtml");
    }

    #[test]
    fn test_find_opf_path_strips_bom() {
        let with_bom = format!("\u{feff}{CONTAINER_XML}");
        let path = find_opf_path(strip_bom(&with_bom)).unwrap();
        assert_eq!(path, "OEBPS/content.opf");
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href(Path::new("OEBPS"), "ch01.xhtml"),
            Some(PathBuf::from("OEBPS/ch01.xhtml"))
        );
        assert_eq!(
            resolve_href(Path::new("OEBPS"), "./sub/../ch01.xhtml"),
            Some(PathBuf::from("OEBPS/ch01.xhtml"))
        );
        assert_eq!(
            resolve_href(Path::new("OEBPS"), "ch01.xhtml#section-2"),
            Some(PathBuf::from("OEBPS/ch01.xhtml"))
        );
        assert_eq!(resolve_href(Path::new("OEBPS"), "../../escape.xhtml"), None);
        assert_eq!(resolve_href(Path::new(""), "/etc/passwd"), None);
    }
}

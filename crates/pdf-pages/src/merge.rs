//! Concatenate PDF files into one document

use crate::io::{load_pdf, save_pdf};
use crate::options::MergeOptions;
use crate::types::*;
use crate::util::ensure_parent_dir;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::time::Instant;

pub const OPERATION_NAME: &str = "merge";

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge `documents` in order into a fresh document with a single page tree
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(PagesError::NoPages);
    }

    let mut merged = Document::with_version("1.7");
    let pages_id = merged.new_object_id();
    let mut max_id = merged.max_id;
    let mut kids = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id + 1);
        max_id = doc.max_id;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &page_ids {
            let inherited = inherited_attributes(&doc, page_id);
            if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
                for (key, value) in inherited {
                    if !page.has(&key) {
                        page.set(key, value);
                    }
                }
                page.set("Parent", Object::Reference(pages_id));
            }
            kids.push(Object::Reference(page_id));
        }

        merged.objects.extend(doc.objects);
    }

    merged.max_id = max_id;

    let page_count = kids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count)),
    ]);
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = merged.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", catalog_id);

    // Old catalogs and page tree nodes are unreachable now
    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();

    Ok(merged)
}

/// Inheritable attributes missing on the page itself, nearest ancestor first
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Depth guard against cyclic page trees
    let mut depth = 0;
    while let Some(node_id) = parent {
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) && !found.iter().any(|(k, _)| k.as_slice() == key) {
                if let Ok(value) = node.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 64 {
            break;
        }
    }

    found
}

/// Merge the files of `options` into `options.output_file`
pub async fn merge_pdfs(options: &MergeOptions) -> Result<MergeSummary> {
    options.validate()?;
    let started = Instant::now();

    let mut documents = Vec::with_capacity(options.pdf_files.len());
    for (idx, path) in options.pdf_files.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", idx + 1, options.pdf_files.len(), path.display());
        documents.push(load_pdf(path).await?);
    }

    let files = documents.len();
    let merged = tokio::task::spawn_blocking(move || merge_documents(documents)).await??;
    let pages = merged.get_pages().len();

    ensure_parent_dir(&options.output_file)?;
    save_pdf(merged, &options.output_file).await?;

    let output_file = std::path::absolute(&options.output_file)?;
    log::info!("Merged PDF saved to: {}", output_file.display());

    Ok(MergeSummary {
        output_file,
        files,
        pages,
        elapsed: started.elapsed(),
    })
}

//! Offline end-to-end flows across the extraction and repair modules.

use crate::key::{PageImage, PageKey, ScrambleKey};
use crate::reassemble::reassemble;
use crate::site;
use crate::testutil::{coordinate_image, make_key, scramble};

/// Viewer page carrying real descriptor JSON for the given key.
fn viewer_html(key: &ScrambleKey) -> String {
    let images = serde_json::to_string(&vec![PageImage {
        id: 10,
        filename: "001.webp".to_string(),
    }])
    .unwrap();
    let keys = serde_json::to_string(&vec![PageKey {
        id: 10,
        key: key.clone(),
    }])
    .unwrap();

    format!(
        "<html><body>\n\
         <script src=\"/static/viewer.js\"></script>\n\
         <script>\n\
         var pagesCount = 1;\n\
         var mangaID = '412';\n\
         var seriesNumber = '7';\n\
         var array = {images};\n\
         var keys = {keys};\n\
         var chapterID = '9001';\n\
         </script>\n\
         </body></html>"
    )
}

#[test]
fn viewer_script_key_repairs_the_page() {
    let mut key = make_key(100, 100, 3, 3, 40, 40);
    key.order = vec![4, 0, 8, 2, 6, 1, 7, 3, 5];
    let original = coordinate_image(100, 100);
    let scrambled = scramble(&original, &key);

    // The key travels through its published form: embedded in the viewer
    // script, extracted, and decoded, never handed over directly.
    let html = viewer_html(&key);
    let viewer = site::extract_viewer_page(&html).unwrap();
    assert_eq!(viewer.pages_count, 1);
    assert_eq!(viewer.images[0].filename, "001.webp");

    let extracted = viewer.key_for(viewer.images[0].id).unwrap();
    let repaired = reassemble(&scrambled, extracted).unwrap();
    assert_eq!(repaired, original);

    let url = site::image_url(
        "https://j1z76bln.user.webaccel.jp",
        &viewer.manga_id,
        &viewer.series_number,
        &viewer.images[0].filename,
    );
    assert_eq!(
        url,
        "https://j1z76bln.user.webaccel.jp/comics/412/web/7/001.webp"
    );
}

#[test]
fn published_json_form_drives_reassembly() {
    // A key as the site serves it, camelCase with the packed list as "slices".
    let raw = r#"{
        "width": 100, "height": 100,
        "xSlices": 3, "ySlices": 3,
        "sliceWidth": 40, "sliceHeight": 40,
        "slices": [8, 7, 6, 5, 4, 3, 2, 1, 0]
    }"#;
    let key: ScrambleKey = serde_json::from_str(raw).unwrap();
    assert_eq!(key.x_slices, 3);
    assert_eq!(key.order, vec![8, 7, 6, 5, 4, 3, 2, 1, 0]);

    let original = coordinate_image(100, 100);
    let scrambled = scramble(&original, &key);
    let repaired = reassemble(&scrambled, &key).unwrap();
    assert_eq!(repaired, original);
}

#[test]
fn key_for_misses_are_skippable_not_fatal() {
    let key = make_key(100, 100, 3, 3, 40, 40);
    let html = viewer_html(&key);
    let mut viewer = site::extract_viewer_page(&html).unwrap();
    viewer.images.push(PageImage {
        id: 99,
        filename: "002.webp".to_string(),
    });

    assert!(viewer.key_for(10).is_some());
    assert!(viewer.key_for(99).is_none());
}

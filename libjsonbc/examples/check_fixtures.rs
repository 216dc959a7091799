//! Encode every JSON fixture and report its size against the text form.

use libjsonbc::{parse, text, KeyDictionary};
use std::fs;
use std::path::Path;

fn main() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test");

    let dict = KeyDictionary::in_memory();
    let mut passed = 0;
    let mut failed = 0;

    let mut paths: Vec<_> = fs::read_dir(test_dir.join("json"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    paths.sort();

    for path in paths {
        let content = fs::read_to_string(&path).unwrap();
        let basename = path.file_stem().unwrap().to_str().unwrap();

        match parse(&content, &dict) {
            Ok(c) => {
                let expected_path = test_dir.join("text").join(format!("{}.txt", basename));
                let expected = fs::read_to_string(&expected_path).unwrap_or_default();
                let actual = text::to_text(&c, &dict).unwrap();

                if actual == expected.trim() {
                    passed += 1;
                    println!(
                        "ok    {:<24} {:>5} bytes json, {:>5} bytes jsonbc",
                        basename,
                        content.len(),
                        c.len()
                    );
                } else {
                    failed += 1;
                    println!("FAIL: {}", basename);
                    println!(
                        "  Expected: {}",
                        expected.trim().chars().take(100).collect::<String>()
                    );
                    println!("  Actual:   {}", actual.chars().take(100).collect::<String>());
                }
            }
            Err(e) => {
                failed += 1;
                println!("Parse error for {}: {}", basename, e);
            }
        }
    }

    println!("\nResults: {} passed, {} failed", passed, failed);
}

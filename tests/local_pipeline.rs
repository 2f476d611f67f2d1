use std::collections::HashMap;
use std::fs;
use std::path::Path;

use predicates::prelude::*;

const HEADERS: &str = "name,gender,imageId,id,isbn,action,title,authorFirstName,authorLastName,\
description,category1,language,primaryMarketplace,priceUsd,priceEur,wasEverPublished,pubStatus,\
pubStatusDetail,coverImageUrl,asin";

fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .map(str::to_owned)
                .zip(record.iter().map(str::to_owned))
                .collect()
        })
        .collect()
}

fn set_action(path: &Path, action: &str) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let column = headers.iter().position(|h| h == "action").unwrap();
    let records = reader
        .records()
        .map(|record| {
            let mut fields = record.unwrap().iter().map(str::to_owned).collect::<Vec<_>>();
            fields[column] = action.to_owned();
            fields
        })
        .collect::<Vec<_>>();

    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(&headers).unwrap();
    for fields in records {
        writer.write_record(&fields).unwrap();
    }
    writer.flush().unwrap();
}

fn run(dir: &Path) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("paperback-pilot");
    cmd.current_dir(dir)
        .args(["-f", "books.csv", "-c", "books.conf", "-d", "content", "-u", "user_data"])
        .assert()
}

#[test]
fn create_price_upload_publish_and_scrape_a_book() {
    let temp = tempfile::TempDir::new().unwrap();
    let dir = temp.path();
    fs::create_dir(dir.join("content")).unwrap();
    fs::write(dir.join("content/7.pdf"), b"%PDF-1.4").unwrap();
    fs::write(dir.join("content/7-cover.pdf"), b"%PDF-1.4").unwrap();
    fs::write(
        dir.join("books.conf"),
        "# shared defaults\nlanguage=English\ntitle=${name}'s Day Out\n",
    )
    .unwrap();
    fs::write(
        dir.join("books.csv"),
        format!(
            "{HEADERS}\nAda,girl,7,,,book-metadata:pricing:content:publish:scrape:scrapeAmazonCoverImageUrl,,Jane,Doe,<p>Fun.</p>,JUV000000,,us,9.99,8.99,,,,,\n"
        ),
    )
    .unwrap();

    run(dir)
        .success()
        .stderr(predicate::str::contains("listing created"))
        .stderr(predicate::str::contains("published"));

    let rows = read_rows(&dir.join("books.csv"));
    assert_eq!(rows.len(), 1);
    let book = &rows[0];
    assert!(book["id"].starts_with('L'), "id: {}", book["id"]);
    assert_eq!(book["action"], "");
    assert_eq!(book["wasEverPublished"], "true");
    assert_eq!(book["pubStatus"], "LIVE");
    assert!(book["asin"].starts_with("B0"), "asin: {}", book["asin"]);
    assert_eq!(book["coverImageUrl"], format!("{}.jpg", book["asin"]));
    // Config defaults are not baked into the file.
    assert_eq!(book["title"], "");
    assert_eq!(book["language"], "");
    assert!(dir.join("user_data/listings.json").exists());
    assert!(!dir.join("books.csv.lock").exists());

    let id = book["id"].clone();
    set_action(&dir.join("books.csv"), "updateMetadataIfNeeded:updatePricingIfNeeded");
    run(dir)
        .success()
        .stderr(predicate::str::contains("metadata differs").not())
        .stderr(predicate::str::contains("pricing differs").not());

    let rows = read_rows(&dir.join("books.csv"));
    assert_eq!(rows[0]["id"], id);
    assert_eq!(rows[0]["action"], "");
}

#[test]
fn failed_action_keeps_the_rest_of_the_chain() {
    let temp = tempfile::TempDir::new().unwrap();
    let dir = temp.path();
    fs::write(dir.join("books.conf"), "").unwrap();
    fs::write(
        dir.join("books.csv"),
        format!(
            "{HEADERS}\nAda,girl,7,,,content:publish:scrape,A Day Out,Jane,Doe,<p>Fun.</p>,JUV000000,English,us,9.99,,,,,,\n"
        ),
    )
    .unwrap();

    run(dir).success();

    let rows = read_rows(&dir.join("books.csv"));
    assert_eq!(rows[0]["action"], "publish:scrape");
    assert_eq!(rows[0]["id"], "");
}

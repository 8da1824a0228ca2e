use std::fs;
use std::path::Path;
use tempfile::tempdir;
use trade_etl::ingestion::clean::clean_table;
use trade_etl::ingestion::fetch::read_table;
use trade_etl::ingestion::patterns::PatternLibrary;
use trade_etl::ingestion::write::{read_processed_csv, write_csv, SqlValue};
use trade_etl::ingestion::RawData;

const INPUT: &str = "\
Importer,Goods Description,Unit,Unit Price (INR),Total Value (INR),Duty Paid (INR),Quantity,Date of Shipment
Acme,\"Model ABC-123, 500 ml Stainless Steel Jar, 24 pcs, USD 12.50\",PCS,\"1,250\",\"1,20,000\",\"Rs. 5,000\",100,15/06/2023
Globex,Borosilicate Bowl 1.5 L,Nos,INR 300,\"30,000\",,0,not a date
Initech,,,,,,,
";

fn run_pipeline(input: &Path, output: &Path) -> usize {
    let raw = read_table(&RawData::File(input.to_path_buf())).unwrap();
    let (cleaned, _) = clean_table(PatternLibrary::global(), &raw);
    write_csv(&cleaned, output).unwrap()
}

fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[test]
fn test_csv_to_csv_pipeline() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("trade.csv");
    let output = dir.path().join("processed.csv");
    fs::write(&input, INPUT).unwrap();

    let written = run_pipeline(&input, &output);
    assert_eq!(written, 3);

    let (headers, rows) = read_output(&output);
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();

    assert_eq!(headers[0], "Importer");
    assert_eq!(rows.len(), 3);

    // Row order preserved
    assert_eq!(rows[0][col("Importer")], "Acme");
    assert_eq!(rows[2][col("Importer")], "Initech");

    let acme = &rows[0];
    assert_eq!(acme[col("model_number")], "ABC-123");
    assert_eq!(acme[col("capacity_spec")], "500 ml");
    assert_eq!(acme[col("material")], "stainless steel");
    assert_eq!(acme[col("Grand Total (INR)")], "125000");
    assert_eq!(acme[col("Landed Cost per Unit (INR)")], "1250");
    assert_eq!(acme[col("Date")], "2023-06-15");
    assert_eq!(acme[col("Year")], "2023");
    assert_eq!(acme[col("Month")], "6");
    assert_eq!(acme[col("parsing_pass")], "true");

    let globex = &rows[1];
    assert_eq!(globex[col("Unit_standard")], "pcs");
    assert_eq!(globex[col("Unit Price (INR)_num")], "300");
    assert_eq!(globex[col("Grand Total (INR)")], "30000");
    assert_eq!(globex[col("Landed Cost per Unit (INR)")], "");
    assert_eq!(globex[col("Date")], "");

    let initech = &rows[2];
    assert_eq!(initech[col("raw_description")], "");
    assert_eq!(initech[col("parsing_confidence")], "0");
    assert_eq!(initech[col("parsing_pass")], "false");
    assert_eq!(initech[col("Grand Total (INR)")], "0");
}

#[test]
fn test_pipeline_is_idempotent() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("trade.csv");
    fs::write(&input, INPUT).unwrap();

    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    run_pipeline(&input, &first);
    run_pipeline(&input, &second);

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_header_only_input_yields_header_only_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("empty.csv");
    let output = dir.path().join("processed.csv");
    fs::write(&input, "Goods Description,Quantity\n").unwrap();

    assert_eq!(run_pipeline(&input, &output), 0);

    let (headers, rows) = read_output(&output);
    assert!(headers.contains(&"Landed Cost per Unit (INR)".to_string()));
    assert!(rows.is_empty());
}

#[test]
fn test_all_empty_descriptions_keep_every_row() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("blank.csv");
    let output = dir.path().join("processed.csv");
    fs::write(&input, "Goods Description,Quantity\n,1\n,2\n,3\n").unwrap();

    assert_eq!(run_pipeline(&input, &output), 3);

    let (headers, rows) = read_output(&output);
    let pass = headers.iter().position(|h| h == "parsing_pass").unwrap();
    assert!(rows.iter().all(|r| r[pass] == "false"));
}

#[test]
fn test_processed_csv_feeds_load_stage() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("trade.csv");
    let output = dir.path().join("processed.csv");
    fs::write(&input, INPUT).unwrap();
    run_pipeline(&input, &output);

    let load = read_processed_csv(&output).unwrap();
    let col = |name: &str| load.columns.iter().position(|(c, _)| c == name).unwrap();

    assert_eq!(load.len(), 3);
    assert_eq!(load.rows[0][col("Quantity_num")], SqlValue::Float(Some(100.0)));
    assert_eq!(load.rows[0][col("Year")], SqlValue::Integer(Some(2023)));
    assert_eq!(load.rows[1][col("Landed Cost per Unit (INR)")], SqlValue::Float(None));
}

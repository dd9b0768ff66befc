use std::fs;
use std::path::Path;

use ecommerce_eda::application::{run_pass, Args};
use ecommerce_eda::events::{EdaError, PassEvent};

const ORDERS: &str = "\
order_date,product_id,category,region,payment_method,quantity,price,discount
2024-01-05,p1,toys,north,card,2,10.0,0.1
2024-02-10,p1,toys,south,cash,1,10.0,0.0
2024-02-11,p2,books,south,card,3,4.0,0.5
2024-04-01,p3,books,east,card,1,50.0,0.2
2024-04-01,p3,books,east,card,1,50.0,0.2
";

fn args(input: Option<&Path>, out_dir: &Path) -> Args {
    Args {
        input: input.map(Path::to_path_buf),
        out_dir: out_dir.to_path_buf(),
        lenient: false,
        json: true,
        top_n: 10,
        verbose: false,
    }
}

#[test]
fn test_full_pass_writes_report() -> Result<(), EdaError> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("orders.csv");
    fs::write(&input, ORDERS)?;
    let out_dir = dir.path().join("report");

    let event = run_pass(&args(Some(&input), &out_dir))?;
    assert_eq!(
        event,
        PassEvent::PassComplete {
            report_dir: out_dir.clone(),
            failed_steps: 0
        }
    );

    let page = fs::read_to_string(out_dir.join("report.html"))?;
    assert!(page.contains("<p>Duplicate rows: 1</p>"));
    assert!(page.contains("<p>Shape: (5, 9)</p>"));
    assert_eq!(page.matches("<svg").count(), 12);

    let charts = fs::read_dir(out_dir.join("charts"))?.count();
    assert_eq!(charts, 12);
    assert!(out_dir.join("charts/01-distribution-quantity.svg").exists());
    assert!(out_dir.join("charts/12-monthly-orders-by-payment.svg").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("summary.json"))?)?;
    assert_eq!(summary["summary"]["duplicate_rows"], 1);
    let top = summary["charts"]
        .as_array()
        .and_then(|charts| charts.iter().find(|c| c["id"] == "top-products"))
        .expect("top products chart");
    assert_eq!(top["kind"]["bars"][0][0], "p3");
    assert_eq!(top["kind"]["bars"][0][1], 80.0);
    Ok(())
}

#[test]
fn test_no_input_awaits_upload() -> Result<(), EdaError> {
    let dir = tempfile::tempdir()?;
    let event = run_pass(&args(None, dir.path()))?;
    assert_eq!(event, PassEvent::AwaitingInput);

    let page = fs::read_to_string(dir.path().join("report.html"))?;
    assert!(page.contains("Please upload a CSV file to begin."));
    assert!(!dir.path().join("charts").exists());
    Ok(())
}

#[test]
fn test_malformed_input_aborts_pass() -> Result<(), EdaError> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("orders.csv");
    fs::write(&input, ORDERS.replace("2024-02-10", "someday"))?;
    let out_dir = dir.path().join("report");

    let err = run_pass(&args(Some(&input), &out_dir)).unwrap_err();
    assert!(err.is_malformed_input());
    // no partial report
    assert!(!out_dir.join("report.html").exists());
    Ok(())
}

#[test]
fn test_lenient_pass_isolates_missing_columns() -> Result<(), EdaError> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("orders.csv");
    fs::write(
        &input,
        "order_date,product_id,quantity,price,discount\n2024-01-05,p1,2,10.0,0.1\n",
    )?;
    let out_dir = dir.path().join("report");

    let mut lenient = args(Some(&input), &out_dir);
    lenient.lenient = true;
    let event = run_pass(&lenient)?;
    assert_eq!(
        event,
        PassEvent::PassComplete {
            report_dir: out_dir.clone(),
            failed_steps: 6
        }
    );

    let page = fs::read_to_string(out_dir.join("report.html"))?;
    assert!(page.contains("count-region failed: missing column: region"));

    // strict mode rejects the same file outright
    let err = run_pass(&args(Some(&input), &out_dir)).unwrap_err();
    assert!(matches!(err, EdaError::MissingColumn(_)));
    Ok(())
}

#[test]
fn test_each_pass_replaces_previous_output() -> Result<(), EdaError> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("orders.csv");
    fs::write(&input, ORDERS)?;
    let out_dir = dir.path().join("report");

    run_pass(&args(Some(&input), &out_dir))?;
    assert!(out_dir.join("summary.json").exists());

    // a full pass without --json drops the old summary
    let mut plain = args(Some(&input), &out_dir);
    plain.json = false;
    run_pass(&plain)?;
    assert!(out_dir.join("report.html").exists());
    assert!(!out_dir.join("summary.json").exists());

    run_pass(&args(Some(&input), &out_dir))?;
    let event = run_pass(&args(None, &out_dir))?;
    assert_eq!(event, PassEvent::AwaitingInput);
    assert!(!out_dir.join("charts").exists());
    assert!(!out_dir.join("summary.json").exists());
    let page = fs::read_to_string(out_dir.join("report.html"))?;
    assert!(!page.contains("p1"));

    run_pass(&args(Some(&input), &out_dir))?;
    let broken = dir.path().join("broken.csv");
    fs::write(&broken, ORDERS.replace("2024-02-10", "someday"))?;
    assert!(run_pass(&args(Some(&broken), &out_dir)).is_err());
    assert!(!out_dir.join("report.html").exists());
    assert!(!out_dir.join("charts").exists());
    assert!(!out_dir.join("summary.json").exists());
    Ok(())
}

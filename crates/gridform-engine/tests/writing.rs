use chrono::{NaiveDate, NaiveDateTime};
use gridform_engine::{
    read_records, write_records, CollectionTemplate, ConvertError, Entity, EntityTemplate,
    EntityWriter, FieldTemplate, FieldValue, Orientation,
};
use gridform_model::{Cell, CellCoord, CellType, Workbook};
use pretty_assertions::assert_eq;

fn coord(s: &str) -> CellCoord {
    CellCoord::parse(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[derive(Clone, Debug, Default, PartialEq)]
struct OrderLine {
    code: Option<String>,
    qty: Option<i64>,
    price: Option<f64>,
    due: Option<NaiveDateTime>,
}

impl Entity for OrderLine {
    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), ConvertError> {
        match field {
            "Code" => self.code = value.opt_text()?,
            "Qty" => self.qty = value.opt_i64()?,
            "Price" => self.price = value.opt_f64()?,
            "Due" => self.due = value.opt_datetime()?,
            _ => {}
        }
        Ok(())
    }

    fn get_field(&self, field: &str) -> FieldValue {
        match field {
            "Code" => self.code.clone().map(FieldValue::Text).into(),
            "Qty" => self.qty.map(FieldValue::Int).into(),
            "Price" => self.price.map(FieldValue::Float).into(),
            "Due" => self.due.map(FieldValue::DateTime).into(),
            _ => FieldValue::Empty,
        }
    }
}

fn line_template(range: &str, end_before: Option<&str>) -> CollectionTemplate {
    CollectionTemplate {
        name: "Lines".to_string(),
        range: range.to_string(),
        orientation: Orientation::Vertical,
        end_before: end_before.map(str::to_string),
        item_template: EntityTemplate {
            range: "A1:D1".to_string(),
            allow_null: false,
            fields: vec![
                FieldTemplate {
                    name: "Code".to_string(),
                    range: "A1".to_string(),
                },
                FieldTemplate {
                    name: "Qty".to_string(),
                    range: "B1".to_string(),
                },
                FieldTemplate {
                    name: "Price".to_string(),
                    range: "C1".to_string(),
                },
                FieldTemplate {
                    name: "Due".to_string(),
                    range: "D1".to_string(),
                },
            ],
            collections: Vec::new(),
        },
    }
}

fn sample_lines() -> Vec<OrderLine> {
    vec![
        OrderLine {
            code: Some("X-100".to_string()),
            qty: Some(4),
            price: Some(2.5),
            due: Some(date(2026, 1, 31)),
        },
        OrderLine {
            code: Some("X-200".to_string()),
            qty: Some(1),
            price: Some(19.0),
            due: Some(date(2026, 2, 14)),
        },
        OrderLine {
            code: Some("X-300".to_string()),
            qty: Some(12),
            price: Some(0.75),
            due: None,
        },
    ]
}

#[test]
fn write_then_read_roundtrips_through_the_same_template() {
    let mut book = Workbook::new();
    book.add_sheet("Sheet1");
    let template = line_template("Sheet1!A2:D4", None);
    let lines = sample_lines();

    write_records(&mut book, &template, &lines).unwrap();
    let read: Vec<OrderLine> = read_records(&mut book, &template).unwrap();
    assert_eq!(read, lines);
}

#[test]
fn string_fields_are_interned_once() {
    let mut book = Workbook::new();
    book.add_sheet("Sheet1");
    let template = line_template("Sheet1!A2:D5", None);
    let repeated = vec![
        OrderLine {
            code: Some("Same".to_string()),
            qty: Some(1),
            ..OrderLine::default()
        },
        OrderLine {
            code: Some("Same".to_string()),
            qty: Some(2),
            ..OrderLine::default()
        },
    ];

    write_records(&mut book, &template, &repeated).unwrap();
    assert_eq!(book.shared_strings.len(), 1);
    let a2 = book.sheets[0].cell(&coord("A2")).unwrap();
    let a3 = book.sheets[0].cell(&coord("A3")).unwrap();
    assert_eq!(a2.data_type, Some(CellType::SharedString));
    assert_eq!(a2.value, a3.value);
}

#[test]
fn growth_past_the_region_inserts_rows_and_shifts_the_tail() {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    // A label right below the two-row collection region.
    sheet.set_cell(&coord("A4"), Cell::inline_string("TOTAL"));
    sheet.set_cell(&coord("B4"), Cell::with_formula("SUM(B2:B3)"));

    let template = line_template("Sheet1!A2:D3", None);
    let lines: Vec<OrderLine> = (0..4)
        .map(|i| OrderLine {
            code: Some(format!("L{i}")),
            qty: Some(i),
            ..OrderLine::default()
        })
        .collect();
    write_records(&mut book, &template, &lines).unwrap();

    let sheet = &book.sheets[0];
    // Two extra rows were inserted; the label moved from row 4 to row 6.
    assert!(sheet.cell(&coord("A4")).is_some());
    let label = sheet.cell(&coord("A6")).unwrap();
    assert_eq!(label.value.as_deref(), Some("TOTAL"));
    // All four items landed in consecutive rows.
    for (i, row) in (2..=5u32).enumerate() {
        let cell = sheet.cell(&coord(&format!("B{row}"))).unwrap();
        assert_eq!(cell.value.as_deref(), Some(i.to_string().as_str()));
    }
}

#[test]
fn growth_before_a_marker_pushes_the_marker_down() {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    sheet.set_cell(&coord("A4"), Cell::inline_string("TOTAL"));
    // Make sure the sheet is tall enough that the region does not limit us.
    sheet.set_cell(&coord("A9"), Cell::inline_string("footer"));
    book.set_defined_name("Total", "Sheet1!$A$4");

    let template = line_template("Sheet1!A2:D8", Some("Total"));
    let lines: Vec<OrderLine> = (0..4)
        .map(|i| OrderLine {
            code: Some(format!("L{i}")),
            qty: Some(i),
            ..OrderLine::default()
        })
        .collect();
    write_records(&mut book, &template, &lines).unwrap();

    // Two rows were written in place, two more inserted before the marker.
    let sheet = &book.sheets[0];
    assert_eq!(
        sheet.cell(&coord("A6")).unwrap().value.as_deref(),
        Some("TOTAL")
    );
    assert_eq!(
        book.defined_name("Total").unwrap().refers_to,
        "Sheet1!$A$6"
    );

    // A re-read bounded by the same (moved) marker sees all four records.
    let read: Vec<OrderLine> = read_records(&mut book, &template).unwrap();
    assert_eq!(read.len(), 4);
}

#[test]
fn writer_advances_one_footprint_per_write() {
    let mut book = Workbook::new();
    book.add_sheet("Sheet1");
    let template = line_template("Sheet1!A2:D6", None);
    let mut writer: EntityWriter<'_, OrderLine> = EntityWriter::new(&mut book, &template);

    let first = OrderLine {
        code: Some("first".to_string()),
        ..OrderLine::default()
    };
    let second = OrderLine {
        code: Some("second".to_string()),
        ..OrderLine::default()
    };
    writer.write(&first).unwrap();
    writer.write(&second).unwrap();

    let strings = &book.shared_strings;
    let sheet = &book.sheets[0];
    let code_at = |r: &str| {
        let raw = sheet.cell(&coord(r)).unwrap().value.clone().unwrap();
        strings.get(raw.parse().unwrap()).unwrap().to_string()
    };
    assert_eq!(code_at("A2"), "first");
    assert_eq!(code_at("A3"), "second");
}

#[test]
fn dates_written_through_a_template_compare_at_day_granularity() {
    let mut book = Workbook::new();
    book.add_sheet("Sheet1");
    let template = line_template("Sheet1!A2:D2", None);
    let line = OrderLine {
        code: Some("dated".to_string()),
        due: Some(date(2024, 6, 30)),
        ..OrderLine::default()
    };
    write_records(&mut book, &template, std::slice::from_ref(&line)).unwrap();

    let cell = book.sheets[0].cell(&coord("D2")).unwrap();
    assert_eq!(cell.data_type, Some(CellType::Date));

    let read: Vec<OrderLine> = read_records(&mut book, &template).unwrap();
    assert_eq!(read[0].due, line.due);
}

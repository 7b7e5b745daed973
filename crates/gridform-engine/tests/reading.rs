use gridform_engine::{
    CollectionTemplate, ConvertError, Entity, EntityReader, EntityTemplate, FieldTemplate,
    FieldValue, Orientation,
};
use gridform_model::{Cell, CellCoord, Workbook};
use pretty_assertions::assert_eq;

fn coord(s: &str) -> CellCoord {
    CellCoord::parse(s).unwrap()
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Pair {
    top: Option<i64>,
    bottom: Option<i64>,
}

impl Entity for Pair {
    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), ConvertError> {
        match field {
            "Top" => self.top = value.opt_i64()?,
            "Bottom" => self.bottom = value.opt_i64()?,
            _ => {}
        }
        Ok(())
    }

    fn get_field(&self, field: &str) -> FieldValue {
        match field {
            "Top" => self.top.map(FieldValue::Int).into(),
            "Bottom" => self.bottom.map(FieldValue::Int).into(),
            _ => FieldValue::Empty,
        }
    }
}

fn pair_template(range: &str, end_before: Option<&str>, allow_null: bool) -> CollectionTemplate {
    CollectionTemplate {
        name: "Pairs".to_string(),
        range: range.to_string(),
        orientation: Orientation::Vertical,
        end_before: end_before.map(str::to_string),
        item_template: EntityTemplate {
            range: "A1:A2".to_string(),
            allow_null,
            fields: vec![
                FieldTemplate {
                    name: "Top".to_string(),
                    range: "A1".to_string(),
                },
                FieldTemplate {
                    name: "Bottom".to_string(),
                    range: "A2".to_string(),
                },
            ],
            collections: Vec::new(),
        },
    }
}

/// Column A filled with 1..=10.
fn ten_rows() -> Workbook {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    for row in 1..=10u32 {
        sheet.set_cell(&coord(&format!("A{row}")), Cell::number(row as f64));
    }
    book
}

#[test]
fn two_row_items_tile_a_ten_row_collection_exactly_five_times() {
    let mut book = ten_rows();
    let template = pair_template("Sheet1!A1:A10", None, false);
    let mut reader: EntityReader<'_, Pair> = EntityReader::new(&mut book, &template);

    let mut items = Vec::new();
    while let Some(item) = reader.try_next().unwrap() {
        items.push(item);
    }
    assert_eq!(items.len(), 5);
    assert_eq!(
        items[0],
        Pair {
            top: Some(1),
            bottom: Some(2)
        }
    );
    assert_eq!(
        items[4],
        Pair {
            top: Some(9),
            bottom: Some(10)
        }
    );

    // Advancing past the end keeps yielding "no more items", not an error.
    assert_eq!(reader.try_next().unwrap(), None);
    assert_eq!(reader.try_next().unwrap(), None);
}

#[test]
fn boundary_marker_caps_iteration_before_data_runs_out() {
    let mut book = ten_rows();
    book.set_defined_name("Stop", "Sheet1!$A$7");
    let template = pair_template("Sheet1!A1:A10", Some("Stop"), false);

    let items: Vec<Pair> = EntityReader::new(&mut book, &template).read_all().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(
        items[2],
        Pair {
            top: Some(5),
            bottom: Some(6)
        }
    );
}

#[test]
fn reset_restarts_from_the_first_item() {
    let mut book = ten_rows();
    let template = pair_template("Sheet1!A1:A10", None, false);
    let mut reader: EntityReader<'_, Pair> = EntityReader::new(&mut book, &template);

    while reader.try_next().unwrap().is_some() {}
    reader.reset();
    assert_eq!(
        reader.try_next().unwrap(),
        Some(Pair {
            top: Some(1),
            bottom: Some(2)
        })
    );
}

#[test]
fn blank_entity_ends_iteration_unless_nulls_are_allowed() {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    sheet.set_cell(&coord("A1"), Cell::number(1.0));
    sheet.set_cell(&coord("A2"), Cell::number(2.0));
    // Rows 3-4 are blank; rows 5-6 hold stray data beyond the gap.
    sheet.set_cell(&coord("A5"), Cell::number(5.0));
    sheet.set_cell(&coord("A6"), Cell::number(6.0));

    let strict = pair_template("Sheet1!A1:A6", None, false);
    let items: Vec<Pair> = EntityReader::new(&mut book, &strict).read_all().unwrap();
    assert_eq!(items.len(), 1);

    let lenient = pair_template("Sheet1!A1:A6", None, true);
    let items: Vec<Pair> = EntityReader::new(&mut book, &lenient).read_all().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[1], Pair::default());
}

#[test]
fn open_collection_ranges_resolve_against_the_sheet_dimension() {
    let mut book = ten_rows();
    // "A1:A" leaves the bottom row open; the dimension (A1:A10) closes it.
    let template = pair_template("Sheet1!A1:A", None, false);
    let items: Vec<Pair> = EntityReader::new(&mut book, &template).read_all().unwrap();
    assert_eq!(items.len(), 5);
}

#[test]
fn collection_range_can_be_a_defined_name() {
    let mut book = ten_rows();
    book.set_defined_name("PairData", "Sheet1!$A$1:$A$4");
    let template = pair_template("PairData", None, false);
    let items: Vec<Pair> = EntityReader::new(&mut book, &template).read_all().unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn horizontal_orientation_tiles_by_columns() {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    for (i, col) in ["A", "B", "C"].iter().enumerate() {
        sheet.set_cell(&coord(&format!("{col}1")), Cell::number((i * 2 + 1) as f64));
        sheet.set_cell(&coord(&format!("{col}2")), Cell::number((i * 2 + 2) as f64));
    }

    let template = CollectionTemplate {
        orientation: Orientation::Horizontal,
        ..pair_template("Sheet1!A1:C2", None, false)
    };
    let items: Vec<Pair> = EntityReader::new(&mut book, &template).read_all().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(
        items[2],
        Pair {
            top: Some(5),
            bottom: Some(6)
        }
    );
}

#[test]
fn iterator_adapter_yields_results() {
    let mut book = ten_rows();
    let template = pair_template("Sheet1!A1:A10", None, false);
    let reader: EntityReader<'_, Pair> = EntityReader::new(&mut book, &template);
    let items: Result<Vec<Pair>, _> = reader.collect();
    assert_eq!(items.unwrap().len(), 5);
}

#[test]
fn conversion_failure_aborts_the_read_with_field_context() {
    let mut book = ten_rows();
    let sheet = &mut book.sheets[0];
    sheet.set_cell(&coord("A3"), Cell::inline_string("not a number"));

    let template = pair_template("Sheet1!A1:A10", None, false);
    let err = EntityReader::<Pair>::new(&mut book, &template)
        .read_all()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Top"), "unexpected error: {message}");
    assert!(message.contains("not a number"), "unexpected error: {message}");
}

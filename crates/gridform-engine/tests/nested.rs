use gridform_engine::{
    read_records, write_records, CollectionTemplate, ConvertError, Entity, EngineError,
    EntityTemplate, FieldTemplate, FieldValue, NestedReader, NestedWriter, Orientation,
};
use gridform_model::{Cell, CellCoord, Workbook};
use pretty_assertions::assert_eq;

fn coord(s: &str) -> CellCoord {
    CellCoord::parse(s).unwrap()
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Item {
    part: Option<String>,
    qty: Option<i64>,
}

impl Entity for Item {
    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), ConvertError> {
        match field {
            "Part" => self.part = value.opt_text()?,
            "Qty" => self.qty = value.opt_i64()?,
            _ => {}
        }
        Ok(())
    }

    fn get_field(&self, field: &str) -> FieldValue {
        match field {
            "Part" => self.part.clone().map(FieldValue::Text).into(),
            "Qty" => self.qty.map(FieldValue::Int).into(),
            _ => FieldValue::Empty,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct PurchaseOrder {
    id: Option<String>,
    items: Vec<Item>,
}

impl Entity for PurchaseOrder {
    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), ConvertError> {
        if field == "Id" {
            self.id = value.opt_text()?;
        }
        Ok(())
    }

    fn get_field(&self, field: &str) -> FieldValue {
        match field {
            "Id" => self.id.clone().map(FieldValue::Text).into(),
            _ => FieldValue::Empty,
        }
    }

    fn read_collections(&mut self, nested: &mut NestedReader<'_, '_>) -> Result<(), EngineError> {
        self.items = nested.read("Items")?;
        Ok(())
    }

    fn write_collections(&self, nested: &mut NestedWriter<'_, '_>) -> Result<(), EngineError> {
        nested.write("Items", &self.items)
    }
}

fn item_collection(range: &str, end_before: Option<&str>) -> CollectionTemplate {
    CollectionTemplate {
        name: "Items".to_string(),
        range: range.to_string(),
        orientation: Orientation::Vertical,
        end_before: end_before.map(str::to_string),
        item_template: EntityTemplate {
            range: "A1:C1".to_string(),
            allow_null: false,
            fields: vec![
                FieldTemplate {
                    name: "Part".to_string(),
                    range: "A1".to_string(),
                },
                FieldTemplate {
                    name: "Qty".to_string(),
                    range: "B1".to_string(),
                },
            ],
            collections: Vec::new(),
        },
    }
}

fn order_template(items: CollectionTemplate) -> CollectionTemplate {
    CollectionTemplate {
        name: "Orders".to_string(),
        range: "Sheet1!A1:C20".to_string(),
        orientation: Orientation::Vertical,
        end_before: None,
        item_template: EntityTemplate {
            range: "A1:C20".to_string(),
            allow_null: false,
            fields: vec![FieldTemplate {
                name: "Id".to_string(),
                range: "B1".to_string(),
            }],
            collections: vec![items],
        },
    }
}

#[test]
fn nested_collections_read_relative_to_the_entity_region() {
    let mut book = Workbook::new();
    let id_index = book.shared_strings.intern("PO-7");
    let sheet = book.add_sheet("Sheet1");
    sheet.set_cell(&coord("B1"), Cell::shared_string(id_index));
    for (i, part) in ["P-1", "P-2", "P-3"].iter().enumerate() {
        let row = 3 + i as u32;
        sheet.set_cell(&coord(&format!("A{row}")), Cell::inline_string(*part));
        sheet.set_cell(&coord(&format!("B{row}")), Cell::number((i + 1) as f64));
    }
    sheet.set_cell(&coord("A7"), Cell::inline_string("TOTAL"));
    // Stray data beyond the marker must never be read.
    sheet.set_cell(&coord("A8"), Cell::inline_string("STRAY"));
    sheet.set_cell(&coord("C20"), Cell::default());
    book.set_defined_name("ItemsEnd", "Sheet1!$A$7");

    let template = order_template(item_collection("A3:C18", Some("ItemsEnd")));
    let orders: Vec<PurchaseOrder> = read_records(&mut book, &template).unwrap();

    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.id.as_deref(), Some("PO-7"));
    assert_eq!(order.items.len(), 3);
    assert_eq!(order.items[0].part.as_deref(), Some("P-1"));
    assert_eq!(order.items[2].qty, Some(3));
}

#[test]
fn nested_write_grows_before_the_marker_and_roundtrips() {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    sheet.set_cell(&coord("A5"), Cell::inline_string("TOTAL"));
    sheet.set_cell(&coord("C20"), Cell::default());
    book.set_defined_name("ItemsEnd", "Sheet1!$A$5");

    let order = PurchaseOrder {
        id: Some("PO-9".to_string()),
        items: (1..=5)
            .map(|i| Item {
                part: Some(format!("P-{i}")),
                qty: Some(i),
            })
            .collect(),
    };

    let template = order_template(item_collection("A3:C18", Some("ItemsEnd")));
    write_records(&mut book, &template, std::slice::from_ref(&order)).unwrap();

    // Two items fit before the marker; three more pushed it down.
    assert_eq!(
        book.defined_name("ItemsEnd").unwrap().refers_to,
        "Sheet1!$A$8"
    );
    assert_eq!(
        book.sheets[0].cell(&coord("A8")).unwrap().value.as_deref(),
        Some("TOTAL")
    );

    let read: Vec<PurchaseOrder> = read_records(&mut book, &template).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0], order);
}

#[test]
fn missing_nested_template_is_a_configuration_error() {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Sheet1");
    sheet.set_cell(&coord("B1"), Cell::inline_string("PO-1"));
    sheet.set_cell(&coord("C20"), Cell::default());

    // The entity asks for "Items" but the template calls it "Rows".
    let mut broken = order_template(item_collection("A3:C18", None));
    broken.item_template.collections[0].name = "Rows".to_string();

    let err = read_records::<PurchaseOrder>(&mut book, &broken).unwrap_err();
    assert!(err.to_string().contains("Items"), "unexpected error: {err}");
}

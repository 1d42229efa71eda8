use std::ops::ControlFlow;

use xml_record_writer::{
    DynamicRecord, FieldDescriptor, FieldType, Record, RecordAction, Value, WriteObserver,
    WriterError,
};

/// Every hook invocation seen by [`RecordingObserver`], in call order
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    Begin,
    End,
    BeforeRecord(u64),
    AfterRecord(u64),
    RecordError(u64, String),
    FieldError(u64, String),
    Progress(u64),
}

/// Observer that logs each hook and answers from its configuration
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<HookEvent>,
    pub fragments: Vec<String>,
    /// Answer for `record_write_error` and `field_write_error`
    pub handle_errors: bool,
    pub abort_before: Option<u64>,
    pub skip: Vec<u64>,
    pub stop_after_progress: Option<u64>,
    /// Field whose value is replaced with upper-cased text before writing
    pub shout_field: Option<String>,
}

impl RecordingObserver {
    pub fn handling_errors() -> Self {
        Self {
            handle_errors: true,
            ..Default::default()
        }
    }

    pub fn count(&self, wanted: fn(&HookEvent) -> bool) -> usize {
        self.events.iter().filter(|e| wanted(e)).count()
    }
}

impl WriteObserver for RecordingObserver {
    fn begin_write(&mut self) -> bool {
        self.events.push(HookEvent::Begin);
        true
    }

    fn end_write(&mut self) {
        self.events.push(HookEvent::End);
    }

    fn before_record_write(&mut self, _record: &dyn Record, index: u64) -> RecordAction {
        self.events.push(HookEvent::BeforeRecord(index));
        if self.abort_before == Some(index) {
            RecordAction::Abort
        } else if self.skip.contains(&index) {
            RecordAction::Skip
        } else {
            RecordAction::Write
        }
    }

    fn after_record_write(&mut self, _record: &dyn Record, index: u64, fragment: &str) -> bool {
        self.events.push(HookEvent::AfterRecord(index));
        self.fragments.push(fragment.to_string());
        true
    }

    fn before_field_write(
        &mut self,
        _record: &dyn Record,
        _index: u64,
        field: &str,
        value: &mut Value,
    ) -> bool {
        if self.shout_field.as_deref() == Some(field)
            && let Value::Text(text) = value
        {
            *text = text.to_uppercase();
        }
        true
    }

    fn record_write_error(&mut self, _record: &dyn Record, index: u64, error: &WriterError) -> bool {
        self.events.push(HookEvent::RecordError(index, error.to_string()));
        self.handle_errors
    }

    fn field_write_error(
        &mut self,
        _record: &dyn Record,
        index: u64,
        field: &str,
        _error: &WriterError,
    ) -> bool {
        self.events.push(HookEvent::FieldError(index, field.to_string()));
        self.handle_errors
    }

    fn rows_written(&mut self, count: u64) -> ControlFlow<()> {
        self.events.push(HookEvent::Progress(count));
        if self.stop_after_progress == Some(count) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Strongly-typed record declaring its own field layout
#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub customer: String,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub city: String,
    pub zip: i64,
}

impl Order {
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            customer: "Ada".to_string(),
            note: None,
            tags: vec!["rust".to_string(), "xml".to_string()],
            city: "Paris".to_string(),
            zip: 75001,
        }
    }
}

impl Record for Order {
    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "Id" => Some(Value::Int(self.id)),
            "Customer" => Some(Value::from(self.customer.as_str())),
            "Note" => Some(self.note.clone().map(Value::from).unwrap_or(Value::Null)),
            "Tags" => Some(Value::Array(
                self.tags.iter().map(|t| Value::from(t.as_str())).collect(),
            )),
            "Address" => Some(Value::Object(
                DynamicRecord::named("Address")
                    .with("City", self.city.as_str())
                    .with("Zip", self.zip),
            )),
            _ => None,
        }
    }

    fn field_names(&self) -> Vec<String> {
        ["Id", "Customer", "Note", "Tags", "Address"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn record_name(&self) -> Option<String> {
        Some("Order".to_string())
    }

    fn describe(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("Customer", FieldType::Text).with_location("//Customer"),
            FieldDescriptor::new("Note", FieldType::Text)
                .with_location("//Note")
                .nullable(),
            FieldDescriptor::new("Tags", FieldType::Array).with_location("//Tags"),
            FieldDescriptor::new("Address", FieldType::Object).with_location("//Address"),
            FieldDescriptor::new("Id", FieldType::Int).with_location("//@Id"),
        ]
    }
}

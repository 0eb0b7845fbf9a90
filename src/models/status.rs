use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Future,
    OnTime,
    Delayed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Future => "future",
            Status::OnTime => "on_time",
            Status::Delayed => "delayed",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Status::OnTime | Status::Delayed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

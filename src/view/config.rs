use chrono_tz::Tz;

/// Sortable (and searchable) table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Name,
    Vin,
    SerialNumber,
    TimeZone,
    RatePlan,
    LicensePlate,
    DeviceType,
    Ignition,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Vin => "vin",
            Self::SerialNumber => "serial_number",
            Self::TimeZone => "time_zone",
            Self::RatePlan => "rate_plan",
            Self::LicensePlate => "license_plate",
            Self::DeviceType => "device_type",
            Self::Ignition => "ignition",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Vin => "VIN",
            Self::SerialNumber => "Serial",
            Self::TimeZone => "Time zone",
            Self::RatePlan => "Rate plan",
            Self::LicensePlate => "Plate",
            Self::DeviceType => "Type",
            Self::Ignition => "Ignition",
        }
    }
}

impl std::fmt::Display for SortColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "name" => Ok(Self::Name),
            "vin" => Ok(Self::Vin),
            "serial" | "serial_number" => Ok(Self::SerialNumber),
            "tz" | "timezone" | "time_zone" => Ok(Self::TimeZone),
            "plan" | "rate_plan" => Ok(Self::RatePlan),
            "plate" | "license_plate" => Ok(Self::LicensePlate),
            "type" | "device_type" => Ok(Self::DeviceType),
            "ignition" => Ok(Self::Ignition),
            other => Err(format!("Invalid sort column: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Asc => "▲",
            Self::Desc => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: SortColumn::Name,
            direction: SortDirection::Asc,
        }
    }
}

/// Summary-card filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Communicating,
    Driving,
    LessUtilized,
    Idling,
}

impl CategoryFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Communicating => "communicating",
            Self::Driving => "driving",
            Self::LessUtilized => "less_utilized",
            Self::Idling => "idling",
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all" => Ok(Self::All),
            "communicating" | "online" => Ok(Self::Communicating),
            "driving" => Ok(Self::Driving),
            "less_utilized" | "lessutilized" => Ok(Self::LessUtilized),
            "idling" => Ok(Self::Idling),
            other => Err(format!("Invalid filter: {other}")),
        }
    }
}

/// Table view state for one session. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    pub search_term: String,
    pub sort: SortState,
    pub active_filter: CategoryFilter,
    /// 1-based.
    pub page: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort: SortState::default(),
            active_filter: CategoryFilter::All,
            page: 1,
        }
    }
}

/// Everything the user can do to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    SearchChanged(String),
    SortClicked(SortColumn),
    FilterClicked(CategoryFilter),
    PageChanged(u32),
    TimezoneChanged(Tz),
}

impl ViewConfig {
    /// Pure reducer: next config for `event`, before page clamping.
    ///
    /// Search, sort, filter and timezone changes always land on page 1.
    /// Clicking the active sort column flips direction; a new column starts
    /// ascending.
    pub fn reduce(&self, event: &ViewEvent) -> ViewConfig {
        let mut next = self.clone();
        match event {
            ViewEvent::SearchChanged(term) => {
                next.search_term = term.clone();
                next.page = 1;
            }
            ViewEvent::SortClicked(column) => {
                next.sort = if self.sort.column == *column {
                    SortState {
                        column: *column,
                        direction: self.sort.direction.toggled(),
                    }
                } else {
                    SortState {
                        column: *column,
                        direction: SortDirection::Asc,
                    }
                };
                next.page = 1;
            }
            ViewEvent::FilterClicked(filter) => {
                next.active_filter = *filter;
                next.page = 1;
            }
            ViewEvent::PageChanged(page) => {
                next.page = (*page).max(1);
            }
            ViewEvent::TimezoneChanged(_) => {
                next.page = 1;
            }
        }
        next
    }

    /// Clamps `page` into `[1, total_pages]`; an empty result stays on page 1.
    pub fn clamped(mut self, total_pages: u32) -> ViewConfig {
        self.page = self.page.clamp(1, total_pages.max(1));
        self
    }
}

use thiserror::Error;

/// Business-rule violations for routes handed to the synthesizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("Route needs at least two points, got {0}")]
    TooFewPoints(usize),

    #[error("Route is too short ({0:.0} m); at least 100 m is required")]
    TooShort(f64),
}

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid route: {0}")]
    Route(#[from] RouteError),
}

impl TrackError {
    pub fn invalid_date_or_time() -> Self {
        TrackError::InvalidProfile("Invalid date or time".to_string())
    }

    pub fn activity_out_of_range() -> Self {
        TrackError::InvalidProfile("Activity would end out of range".to_string())
    }
}

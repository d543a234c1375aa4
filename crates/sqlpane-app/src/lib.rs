// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod forms;
pub mod ids;
pub mod jobs;
pub mod model;
pub mod session;
pub mod state;

pub use forms::*;
pub use ids::*;
pub use jobs::*;
pub use model::*;
pub use session::*;
pub use state::*;

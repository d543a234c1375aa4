// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sqlpane_app::{Filter, Pagination, Sort};
use std::collections::BTreeSet;

/// One independently owned dimension of grid state. A controlled axis is
/// owned by the caller: the grid reports requested changes and shows only
/// what the caller echoes back. An uncontrolled axis is owned by the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisState<T> {
    Controlled(T),
    Uncontrolled(T),
}

impl<T> AxisState<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Controlled(value) | Self::Uncontrolled(value) => value,
        }
    }

    pub const fn is_controlled(&self) -> bool {
        matches!(self, Self::Controlled(_))
    }

    /// Echo from the caller. Uncontrolled axes ignore it.
    pub fn sync(&mut self, value: T) -> bool {
        match self {
            Self::Controlled(current) => {
                *current = value;
                true
            }
            Self::Uncontrolled(_) => false,
        }
    }
}

impl<T: Clone> AxisState<T> {
    /// A change requested through the grid. Only an uncontrolled axis takes
    /// the value; the returned copy goes out in the change event either way.
    pub fn request(&mut self, next: T) -> T {
        if let Self::Uncontrolled(current) = self {
            *current = next.clone();
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisControl {
    pub pagination: bool,
    pub sort: bool,
    pub filters: bool,
}

impl AxisControl {
    pub const fn all_controlled(self) -> bool {
        self.pagination && self.sort && self.filters
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridAxes {
    pub pagination: AxisState<Pagination>,
    pub sort: AxisState<Option<Sort>>,
    pub filters: AxisState<Vec<Filter>>,
    pub selection: AxisState<BTreeSet<usize>>,
}

impl GridAxes {
    /// Every axis handled inside the grid over a fully loaded dataset.
    pub fn client_side(page_size: usize) -> Self {
        Self {
            pagination: AxisState::Uncontrolled(Pagination::new(1, page_size)),
            sort: AxisState::Uncontrolled(None),
            filters: AxisState::Uncontrolled(Vec::new()),
            selection: AxisState::Uncontrolled(BTreeSet::new()),
        }
    }

    /// Pagination, sort, and filters owned by the caller, which fetches each
    /// page from the server. Selection stays local.
    pub fn server_side(page_size: usize, filters: Vec<Filter>) -> Self {
        Self {
            pagination: AxisState::Controlled(Pagination::new(1, page_size)),
            sort: AxisState::Controlled(None),
            filters: AxisState::Controlled(filters),
            selection: AxisState::Uncontrolled(BTreeSet::new()),
        }
    }

    pub fn control(&self) -> AxisControl {
        AxisControl {
            pagination: self.pagination.is_controlled(),
            sort: self.sort.is_controlled(),
            filters: self.filters.is_controlled(),
        }
    }
}

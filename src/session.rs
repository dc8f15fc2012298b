//! Search session state: form fields, busy flag and the latest results.
//!
//! A `Session` is owned by whatever front end drives searches. Every search
//! gets a monotonically increasing request id, and a completion is only
//! applied when its id is still the latest one issued. A slow response
//! therefore can never overwrite the outcome of a newer search.

use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::debug;

use crate::{
    error::{FetchError, SessionError},
    markdown::to_markdown,
    query::fetch_merged_pull_requests,
    types::{DATE_FORMAT, Forge, MergedAfter, PullRequest, Repo, SearchSpec, Token},
};

/// First day of the month containing `today`.
pub fn first_of_month(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.day0()))
}

/// First day of the month before the one containing `today`.
pub fn first_of_previous_month(today: NaiveDate) -> NaiveDate {
    first_of_month(first_of_month(today) - Duration::days(1))
}

/// Raw, user-supplied search inputs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SearchForm {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub merged_after: String,
}

impl fmt::Debug for SearchForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchForm")
            .field("token", &"[REDACTED]")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("merged_after", &self.merged_after)
            .finish()
    }
}

impl SearchForm {
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    fn missing_field(&self) -> Option<&'static str> {
        [
            ("token", &self.token),
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("merged_after", &self.merged_after),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Validates the fields and builds a search specification.
    pub fn to_spec(&self) -> Result<SearchSpec, SessionError> {
        if let Some(field) = self.missing_field() {
            return Err(SessionError::Incomplete(field));
        }
        Ok(SearchSpec::new(
            Token::new(self.token.as_str())?,
            Repo::new(self.owner.as_str(), self.repo.as_str())?,
            MergedAfter::parse(&self.merged_after)?,
        ))
    }
}

/// Handle for one issued search.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    spec: SearchSpec,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Default)]
pub struct Session {
    pub form: SearchForm,
    busy: bool,
    latest_request: u64,
    results: Vec<PullRequest>,
    error: Option<FetchError>,
}

impl Session {
    pub fn new(form: SearchForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Submission requires every field and no search in flight.
    pub fn can_submit(&self) -> bool {
        !self.busy && self.form.is_complete()
    }

    pub fn results(&self) -> &[PullRequest] {
        &self.results
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Guidance text for the current error, if any applies.
    pub fn guidance(&self) -> Option<&'static str> {
        self.error.as_ref().and_then(FetchError::hint)
    }

    /// Markdown export of the current results.
    pub fn markdown(&self) -> String {
        to_markdown(&self.results)
    }

    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    pub fn set_merged_after(&mut self, date: NaiveDate) {
        self.form.merged_after = date.format(DATE_FORMAT).to_string();
    }

    pub fn set_current_month(&mut self, today: NaiveDate) {
        self.set_merged_after(first_of_month(today));
    }

    pub fn set_previous_month(&mut self, today: NaiveDate) {
        self.set_merged_after(first_of_previous_month(today));
    }

    pub fn set_current_month_now(&mut self) {
        self.set_current_month(Local::now().date_naive());
    }

    pub fn set_previous_month_now(&mut self) {
        self.set_previous_month(Local::now().date_naive());
    }

    /// Starts a search: marks the session busy and clears old output.
    ///
    /// Nothing changes when the session is busy or the form is invalid.
    pub fn begin_search(&mut self) -> Result<RequestTicket, SessionError> {
        if self.busy {
            return Err(SessionError::Busy);
        }
        let spec = self.form.to_spec()?;

        self.latest_request += 1;
        self.busy = true;
        self.error = None;
        self.results.clear();

        debug!(request = self.latest_request, repo = %spec.repo, "Search started");

        Ok(RequestTicket {
            id: self.latest_request,
            spec,
        })
    }

    /// Applies the outcome of a search.
    ///
    /// Returns `false` and leaves the session untouched when `ticket` was
    /// superseded by a newer request.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<Vec<PullRequest>, FetchError>,
    ) -> bool {
        if ticket.id != self.latest_request {
            debug!(
                request = ticket.id,
                latest = self.latest_request,
                "Discarding stale search response"
            );
            return false;
        }

        self.busy = false;
        match outcome {
            Ok(prs) => {
                debug!(request = ticket.id, count = prs.len(), "Search finished");
                self.results = prs;
            }
            Err(err) => {
                debug!(request = ticket.id, kind = ?err.kind(), "Search failed");
                self.error = Some(err);
            }
        }
        true
    }

    /// Gives up on a search without an outcome, e.g. after a timeout.
    ///
    /// Releases the busy flag so a new search can start. A late completion
    /// for `ticket` is then discarded as stale.
    pub fn abandon(&mut self, ticket: RequestTicket) {
        if ticket.id == self.latest_request {
            debug!(request = ticket.id, "Search abandoned");
            self.busy = false;
        }
    }

    /// Runs one search end to end against `forge`.
    ///
    /// Returns whether the outcome was applied. The busy flag is released on
    /// every exit path, including when this future is dropped before the
    /// forge answers.
    pub async fn search<F>(&mut self, forge: &F) -> Result<bool, SessionError>
    where
        F: Forge + ?Sized,
    {
        let ticket = self.begin_search()?;
        let spec = ticket.spec.clone();
        let mut in_flight = InFlight {
            session: self,
            ticket: Some(ticket),
        };

        let outcome = fetch_merged_pull_requests(&spec, forge).await;
        Ok(in_flight.finish(outcome))
    }
}

/// Releases the busy flag if a search future is dropped mid-request.
struct InFlight<'a> {
    session: &'a mut Session,
    ticket: Option<RequestTicket>,
}

impl InFlight<'_> {
    fn finish(&mut self, outcome: Result<Vec<PullRequest>, FetchError>) -> bool {
        match self.ticket.take() {
            Some(ticket) => self.session.complete(ticket, outcome),
            None => false,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.session.abandon(ticket);
        }
    }
}

//! # Branch/Clone Resolver
//!
//! Promotion and shadowing on top of the repository client library. The
//! library itself sits behind [`RepositoryClient`]; this module only
//! resolves labels and versions, decides what to commit and turns results
//! into plain [`TroveTuple`]s.
//!
//! Arguments may arrive as text or as already-parsed values. [`Spec`]
//! carries either form and [`Spec::resolve`] is applied once on entry, so
//! nothing past the boundary deals with raw strings.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;

use crate::error::{Error, Result};

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^@:/\s]+)@([^@:/\s]+):([^@:/\s]+)$").expect("valid regex")
});

/// `host@namespace:tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub host: String,
    pub namespace: String,
    pub tag: String,
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = LABEL
            .captures(s)
            .ok_or_else(|| Error::validation("label", s))?;
        Ok(Label {
            host: caps[1].to_string(),
            namespace: caps[2].to_string(),
            tag: caps[3].to_string(),
        })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.host, self.namespace, self.tag)
    }
}

/// Whether `label` parses as a label.
pub fn is_valid_label(label: &str) -> bool {
    label.parse::<Label>().is_ok()
}

/// A full version or branch: `/label[//shadow-label...][/revision]`.
///
/// Only the labels are understood; the revision is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    raw: String,
    labels: Vec<Label>,
    revision: Option<String>,
}

impl Version {
    /// The label the version lives on.
    pub fn trailing_label(&self) -> &Label {
        // parsing guarantees at least one label
        &self.labels[self.labels.len() - 1]
    }

    /// A branch has no revision.
    pub fn is_branch(&self) -> bool {
        self.revision.is_none()
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation("version", s);
        let rest = s.strip_prefix('/').ok_or_else(invalid)?;
        let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
        let (revision, label_parts) = match parts.split_last() {
            Some((last, init)) if !last.contains('@') => (Some(last.to_string()), init),
            Some(_) => (None, parts.as_slice()),
            None => return Err(invalid()),
        };
        if label_parts.is_empty() {
            return Err(invalid());
        }
        let labels = label_parts
            .iter()
            .map(|part| part.parse::<Label>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Version {
            raw: s.to_string(),
            labels,
            revision,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Build flags, never interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Flavor(pub String);

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a promoted label goes: a label, or a full branch when the target
/// text starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteTarget {
    Label(Label),
    Branch(Version),
}

impl fmt::Display for PromoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoteTarget::Label(label) => label.fmt(f),
            PromoteTarget::Branch(branch) => branch.fmt(f),
        }
    }
}

/// Parsing from argument text.
pub trait ParseSpec: Sized {
    fn parse_spec(raw: &str) -> Result<Self>;
}

impl ParseSpec for Label {
    /// A leading `/` names a version whose trailing label is meant, and
    /// `label/revision` names the label.
    fn parse_spec(raw: &str) -> Result<Self> {
        if raw.starts_with('/') {
            let version: Version = raw.parse()?;
            return Ok(version.trailing_label().clone());
        }
        match raw.split_once('/') {
            Some((label, rest)) if !rest.contains('/') => label.parse(),
            _ => raw.parse(),
        }
    }
}

impl ParseSpec for Version {
    fn parse_spec(raw: &str) -> Result<Self> {
        raw.parse()
    }
}

impl ParseSpec for PromoteTarget {
    fn parse_spec(raw: &str) -> Result<Self> {
        if raw.starts_with('/') {
            Ok(PromoteTarget::Branch(raw.parse()?))
        } else {
            Ok(PromoteTarget::Label(Label::parse_spec(raw)?))
        }
    }
}

impl ParseSpec for Flavor {
    fn parse_spec(raw: &str) -> Result<Self> {
        Ok(Flavor(raw.trim().to_string()))
    }
}

/// A value given either as text or already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec<T> {
    Raw(String),
    Parsed(T),
}

impl<T: ParseSpec> Spec<T> {
    pub fn resolve(self) -> Result<T> {
        match self {
            Spec::Raw(raw) => T::parse_spec(&raw),
            Spec::Parsed(value) => Ok(value),
        }
    }
}

impl<T> From<&str> for Spec<T> {
    fn from(raw: &str) -> Self {
        Spec::Raw(raw.to_string())
    }
}

impl<T> From<String> for Spec<T> {
    fn from(raw: String) -> Self {
        Spec::Raw(raw)
    }
}

impl From<Label> for Spec<Label> {
    fn from(label: Label) -> Self {
        Spec::Parsed(label)
    }
}

impl From<Version> for Spec<Version> {
    fn from(version: Version) -> Self {
        Spec::Parsed(version)
    }
}

impl From<PromoteTarget> for Spec<PromoteTarget> {
    fn from(target: PromoteTarget) -> Self {
        Spec::Parsed(target)
    }
}

/// `(name, version, flavor)` as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TroveTuple {
    pub name: String,
    pub version: String,
    pub flavor: String,
}

impl TroveTuple {
    pub fn new(name: impl Into<String>, version: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            flavor: flavor.into(),
        }
    }
}

impl fmt::Display for TroveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.version)?;
        if !self.flavor.is_empty() {
            write!(f, "[{}]", self.flavor)?;
        }
        Ok(())
    }
}

/// Source label to promotion target, resolved on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    entries: Vec<(Label, PromoteTarget)>,
}

impl LabelMap {
    pub fn new<I, F, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<Spec<Label>>,
        T: Into<Spec<PromoteTarget>>,
    {
        let mut entries: Vec<(Label, PromoteTarget)> = Vec::new();
        for (from, to) in pairs {
            let from = from.into().resolve()?;
            let to = to.into().resolve()?;
            match entries.iter_mut().find(|(existing, _)| *existing == from) {
                Some(entry) => entry.1 = to,
                None => entries.push((from, to)),
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, from: &Label) -> Option<&PromoteTarget> {
        self.entries.iter().find(|(l, _)| l == from).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Label, PromoteTarget)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// New trove versions produced by a clone or shadow, ready to commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub new_troves: Vec<TroveTuple>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new_troves.is_empty()
    }
}

/// Outcome of a shadow request: shadows that already existed plus the
/// changeset creating the missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowResult {
    pub existing: Vec<TroveTuple>,
    pub changeset: Option<ChangeSet>,
}

/// The repository client library.
pub trait RepositoryClient {
    /// Compute a sibling clone of `troves` following `label_map`, sources
    /// included. `None` when nothing can be promoted.
    fn create_sibling_clone_changeset(
        &self,
        label_map: &LabelMap,
        troves: &[TroveTuple],
    ) -> Result<Option<ChangeSet>>;

    /// Compute shadows of `troves` onto `target`. `None` when there is
    /// nothing to shadow.
    fn create_shadow_changeset(
        &self,
        target: &Label,
        troves: &[(String, Version, Flavor)],
    ) -> Result<Option<ShadowResult>>;

    fn commit_changeset(&self, changeset: &ChangeSet) -> Result<()>;
}

pub struct RepositoryFacade {
    client: Box<dyn RepositoryClient>,
}

impl RepositoryFacade {
    pub fn new(client: Box<dyn RepositoryClient>) -> Self {
        Self { client }
    }

    /// Promote `troves` along `label_map`.
    ///
    /// Returns the troves the promotion creates. With `info_only` nothing
    /// is committed.
    pub fn promote(
        &self,
        troves: &[TroveTuple],
        label_map: &LabelMap,
        info_only: bool,
    ) -> Result<Vec<TroveTuple>> {
        let changeset = self
            .client
            .create_sibling_clone_changeset(label_map, troves)?
            .ok_or_else(|| Error::rbuild("Promote failed."))?;
        if info_only {
            debug!("dry run, {} troves not committed", changeset.new_troves.len());
        } else {
            self.client.commit_changeset(&changeset)?;
            info!("Promoted {} troves", changeset.new_troves.len());
        }
        Ok(changeset.new_troves)
    }

    /// Shadow a source trove onto `target`.
    ///
    /// Returns pre-existing shadows followed by the new ones, or `None`
    /// when the client had nothing to do.
    pub fn shadow_source(
        &self,
        name: &str,
        version: impl Into<Spec<Version>>,
        target: impl Into<Spec<Label>>,
    ) -> Result<Option<Vec<TroveTuple>>> {
        let version = version.into().resolve()?;
        let target = target.into().resolve()?;
        let request = [(name.to_string(), version, Flavor::default())];
        let Some(result) = self.client.create_shadow_changeset(&target, &request)? else {
            return Ok(None);
        };
        if let Some(changeset) = result.changeset.as_ref().filter(|cs| !cs.is_empty()) {
            self.client.commit_changeset(changeset)?;
        }
        let mut troves = result.existing;
        if let Some(changeset) = result.changeset {
            troves.extend(changeset.new_troves);
        }
        Ok(Some(troves))
    }

    pub fn is_valid_label(&self, label: &str) -> bool {
        is_valid_label(label)
    }
}

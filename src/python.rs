use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::compatibility::CompatibilityScorer;
use crate::engine::{MatchEngine, RecomputeSummary};
use crate::error::MatchError;
use crate::models::*;
use crate::store::SqliteStore;

fn runtime_err(e: MatchError) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string())
}

/// Python-facing wrapper for MatchEngine over SQLite
#[pyclass(name = "MatchEngine", unsendable)]
struct PyMatchEngine {
    inner: MatchEngine<SqliteStore>,
}

#[pymethods]
impl PyMatchEngine {
    #[new]
    #[pyo3(signature = (path=None))]
    fn new(path: Option<&str>) -> PyResult<Self> {
        let store = match path {
            Some(p) => SqliteStore::persistent(p),
            None => SqliteStore::in_memory(),
        };
        store
            .map(|s| PyMatchEngine {
                inner: MatchEngine::new(s),
            })
            .map_err(runtime_err)
    }

    /// Create a city. Returns its id.
    fn add_city(&self, name: &str) -> PyResult<i64> {
        self.inner.store().insert_city(name).map_err(runtime_err)
    }

    fn cities(&self, py: Python) -> PyResult<Py<PyAny>> {
        let cities = self.inner.store().list_cities().map_err(runtime_err)?;

        let list = PyList::empty(py);
        for city in cities {
            let d = PyDict::new(py);
            d.set_item("id", city.id)?;
            d.set_item("name", &city.name)?;
            list.append(d)?;
        }
        Ok(list.into())
    }

    /// Insert a user from a dict. Returns the new user id.
    fn add_user(&self, user_dict: &Bound<'_, PyDict>) -> PyResult<i64> {
        let user = dict_to_new_user(user_dict)?;
        self.inner.store().insert_user(&user).map_err(runtime_err)
    }

    /// Rebuild every match of a city. Returns the run summary.
    fn recompute_city(&mut self, py: Python, city_id: i64) -> PyResult<Py<PyAny>> {
        let summary = self.inner.recompute_city(city_id).map_err(runtime_err)?;
        Ok(summary_to_dict(py, &summary)?.into())
    }

    /// Stored matches of a user, best first.
    fn matches_for_user(&self, py: Python, user_id: i64) -> PyResult<Py<PyAny>> {
        let views = self.inner.matches_for_user(user_id).map_err(runtime_err)?;

        let list = PyList::empty(py);
        for view in &views {
            let d = record_to_dict(py, &view.record)?;
            d.set_item("username", &view.username)?;
            list.append(d)?;
        }
        Ok(list.into())
    }
}

/// Python-facing pair scorer
#[pyclass(name = "CompatibilityScorer")]
struct PyCompatibilityScorer {
    inner: CompatibilityScorer,
}

#[pymethods]
impl PyCompatibilityScorer {
    #[new]
    fn new() -> Self {
        PyCompatibilityScorer {
            inner: CompatibilityScorer::new(),
        }
    }

    /// Score two profile dicts from the first one's side.
    fn score(
        &self,
        py: Python,
        a: &Bound<'_, PyDict>,
        b: &Bound<'_, PyDict>,
    ) -> PyResult<Py<PyAny>> {
        let a = dict_to_profile(a)?;
        let b = dict_to_profile(b)?;
        let s = self.inner.score(&a, &b);

        let dict = PyDict::new(py);
        dict.set_item("total_compatibility", s.total)?;
        dict.set_item("character_compatibility", s.character)?;
        dict.set_item("desired_compatibility", s.desired)?;
        dict.set_item("embedding_compatibility", s.embedding)?;
        dict.set_item("my_perspective", s.my_perspective)?;
        dict.set_item("their_perspective", s.their_perspective)?;
        dict.set_item("i_have_what_they_want", &s.i_have_what_they_want)?;
        dict.set_item("they_have_what_i_want", &s.they_have_what_i_want)?;
        dict.set_item("common_traits", &s.common_traits)?;
        Ok(dict.into())
    }
}

// ── Conversion helpers ──────────────────────────────────────────────

fn key_error(key: &str) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyKeyError, _>(key.to_string())
}

fn dict_to_new_user(dict: &Bound<'_, PyDict>) -> PyResult<NewUser> {
    let username: String = dict
        .get_item("username")?
        .ok_or_else(|| key_error("username"))?
        .extract()?;
    let city_id: i64 = dict
        .get_item("city_id")?
        .ok_or_else(|| key_error("city_id"))?
        .extract()?;

    let mut user = NewUser::new(&username, city_id);

    if let Some(story) = dict.get_item("story")? {
        if let Some(story) = story.extract::<Option<String>>()? {
            user = user.with_story(&story);
        }
    }
    if let Some(gender) = dict.get_item("gender")? {
        if let Some(gender) = gender.extract::<Option<String>>()? {
            user = user.with_gender(&gender);
        }
    }
    if let Some(o) = dict.get_item("sexual_orientation")? {
        if let Some(o) = o.extract::<Option<String>>()? {
            user = user.with_orientation(Orientation::parse(&o));
        }
    }

    let traits = extract_traits(dict)?;
    if !traits.self_traits.is_empty() || !traits.desired_traits.is_empty() {
        user = user.with_traits(traits);
    }

    Ok(user)
}

fn dict_to_profile(dict: &Bound<'_, PyDict>) -> PyResult<Profile> {
    let id: i64 = match dict.get_item("id")? {
        Some(id) => id.extract::<Option<i64>>()?.unwrap_or_default(),
        None => 0,
    };
    let mut profile = Profile::new(id);

    if let Some(gender) = dict.get_item("gender")? {
        if let Some(gender) = gender.extract::<Option<String>>()? {
            profile = profile.with_gender(&gender);
        }
    }
    if let Some(o) = dict.get_item("sexual_orientation")? {
        if let Some(o) = o.extract::<Option<String>>()? {
            profile = profile.with_orientation(Orientation::parse(&o));
        }
    }

    let traits = extract_traits(dict)?;
    Ok(profile
        .with_self_traits(traits.self_traits.iter().map(|s| s.as_str()).collect())
        .with_desired_traits(traits.desired_traits.iter().map(|s| s.as_str()).collect())
        .with_embeddings(traits.self_embedding, traits.desired_embedding))
}

/// Trait lists and embeddings; missing or `None` keys are empty.
fn extract_traits(dict: &Bound<'_, PyDict>) -> PyResult<ProfileTraits> {
    let mut traits = ProfileTraits::default();

    if let Some(v) = dict.get_item("self_traits")? {
        traits.self_traits = v.extract::<Option<Vec<String>>>()?.unwrap_or_default();
    }
    if let Some(v) = dict.get_item("desired_traits")? {
        traits.desired_traits = v.extract::<Option<Vec<String>>>()?.unwrap_or_default();
    }
    if let Some(v) = dict.get_item("self_embedding")? {
        traits.self_embedding = v.extract::<Option<Vec<f64>>>()?.unwrap_or_default();
    }
    if let Some(v) = dict.get_item("desired_embedding")? {
        traits.desired_embedding = v.extract::<Option<Vec<f64>>>()?.unwrap_or_default();
    }

    Ok(traits)
}

fn record_to_dict<'py>(py: Python<'py>, record: &MatchRecord) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("user_id", record.user_id)?;
    dict.set_item("matched_user_id", record.matched_user_id)?;
    dict.set_item("total_compatibility", record.total_compatibility)?;
    dict.set_item("character_compatibility", record.character_compatibility)?;
    dict.set_item("desired_compatibility", record.desired_compatibility)?;
    dict.set_item("embedding_compatibility", record.embedding_compatibility)?;
    dict.set_item("my_perspective", record.my_perspective)?;
    dict.set_item("their_perspective", record.their_perspective)?;
    dict.set_item("i_have_what_they_want", &record.i_have_what_they_want)?;
    dict.set_item("they_have_what_i_want", &record.they_have_what_i_want)?;
    dict.set_item("common_traits", &record.common_traits)?;
    Ok(dict)
}

fn summary_to_dict<'py>(py: Python<'py>, s: &RecomputeSummary) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("run_id", s.run_id.to_string())?;
    dict.set_item("city_id", s.city_id)?;
    dict.set_item("users_loaded", s.users_loaded)?;
    dict.set_item("pairs_considered", s.pairs_considered)?;
    dict.set_item("pairs_matched", s.pairs_matched)?;
    dict.set_item("rows_cleared", s.rows_cleared)?;
    dict.set_item("rows_written", s.rows_written)?;
    dict.set_item("started_at", s.started_at.to_rfc3339())?;
    dict.set_item("finished_at", s.finished_at.to_rfc3339())?;
    Ok(dict)
}

/// Python module definition
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMatchEngine>()?;
    m.add_class::<PyCompatibilityScorer>()?;
    Ok(())
}

//! Courses, and the list of every course on the site
use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{params::is_truthy, Client, Error, Result};

pub const GET_COURSES: &str = "core_course_get_courses";
pub const CREATE_COURSES: &str = "core_course_create_courses";
pub const UPDATE_COURSES: &str = "core_course_update_courses";

/// A single course.
///
/// Moodle's course records are open-ended, so attributes are kept as-is rather than
/// in a fixed struct:
///
/// ```
/// use moodle_client::Course;
/// use serde_json::json;
///
/// let mut course = Course::new();
/// course.set("fullname", json!("Example course"));
/// course.set("shortname", json!("example"));
/// course.set("categoryid", json!(1));
/// course.set("idnumber", json!(123));
/// assert_eq!(course.idnumber().as_deref(), Some("123"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Course {
    attrs: Map<String, Value>,
}

impl Course {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attrs(attrs: Map<String, Value>) -> Self {
        Course { attrs }
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }

    /// Set an attribute, returning its previous value
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.attrs.insert(field.into(), value)
    }

    pub fn id(&self) -> Option<i64> {
        self.attrs.get("id").and_then(Value::as_i64)
    }

    /// The course's idnumber, if it has a non-empty one
    pub fn idnumber(&self) -> Option<String> {
        match self.attrs.get("idnumber") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(v) if is_truthy(v) => Some(v.to_string()),
            _ => None,
        }
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp("startdate")
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.timestamp("enddate")
    }

    fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        // Moodle uses 0 for "not set"
        let secs = self.attrs.get(field)?.as_i64().filter(|s| *s != 0)?;
        Utc.timestamp_opt(secs, 0).single()
    }

    /// Create this course on moodle, picking up the id it was given
    pub fn create(&mut self, client: &Client) -> Result<()> {
        let res = client.call(CREATE_COURSES, json!({ "courses": [&self.attrs] }))?;
        if let Some(id) = res
            .as_array()
            .and_then(|created| created.first())
            .and_then(|c| c.get("id"))
        {
            self.attrs.insert("id".to_string(), id.clone());
        }

        Ok(())
    }

    /// Push every attribute of this course to moodle
    pub fn update(&self, client: &Client) -> Result<()> {
        client.call(UPDATE_COURSES, json!({ "courses": [&self.attrs] }))?;
        Ok(())
    }

    /// Set fields from per-language text, using moodle's multilang markup.
    ///
    /// A single language is stored as plain text. Otherwise each language with
    /// non-empty text becomes a `<span class="multilang">`. Values that aren't
    /// objects are ignored.
    ///
    /// ```
    /// use moodle_client::Course;
    /// use serde_json::json;
    ///
    /// let mut course = Course::new();
    /// course.i18n_set([("fullname", json!({"en": "Course", "sl": "Predmet"}))]);
    /// assert_eq!(
    ///     course.get("fullname"),
    ///     Some(&json!(r#"<span class="multilang" lang="en">Course</span><span class="multilang" lang="sl">Predmet</span>"#))
    /// );
    /// ```
    pub fn i18n_set<I, K>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (field, value) in fields {
            if let Value::Object(texts) = value {
                self.attrs.insert(field.into(), Value::String(multilang(&texts)));
            }
        }
    }

    /// This course, restricted to `fields`
    fn project(&self, fields: &[&str]) -> Result<Map<String, Value>> {
        fields
            .iter()
            .map(|f| match self.attrs.get(*f) {
                Some(v) => Ok((f.to_string(), v.clone())),
                None => Err(Error::MissingAttribute {
                    course: self.id(),
                    field: f.to_string(),
                }),
            })
            .collect()
    }
}

fn multilang(texts: &Map<String, Value>) -> String {
    if texts.len() == 1 {
        return texts.values().map(text).collect();
    }

    texts
        .iter()
        .filter(|(_, t)| is_truthy(t))
        .map(|(lang, t)| {
            format!(
                r#"<span class="multilang" lang="{}">{}</span>"#,
                lang,
                text(t)
            )
        })
        .collect()
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<Map<String, Value>> for Course {
    fn from(attrs: Map<String, Value>) -> Self {
        Course::from_attrs(attrs)
    }
}

impl TryFrom<Value> for Course {
    type Error = Value;

    /// Only objects are courses; anything else is handed back
    fn try_from(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(attrs) => Ok(Course { attrs }),
            other => Err(other),
        }
    }
}

/// Every course on the site, indexed by id and idnumber.
///
/// This is a snapshot, and isn't updated when courses are changed afterwards.
#[derive(Clone, Debug, Default)]
pub struct CourseList {
    courses: Vec<Course>,
    id_index: HashMap<i64, usize>,
    idnumber_index: HashMap<String, usize>,
}

impl CourseList {
    pub fn fetch(client: &Client) -> Result<Self> {
        let unexpected = || Error::UnexpectedResponse {
            function: GET_COURSES.to_string(),
            expected: "a list of courses",
        };

        let Value::Array(records) = client.call(GET_COURSES, json!({}))? else {
            return Err(unexpected());
        };
        let courses = records
            .into_iter()
            .map(|r| Course::try_from(r).map_err(|_| unexpected()))
            .collect::<Result<Vec<_>>>()?;

        Self::from_courses(courses)
    }

    /// Index an existing set of courses, which must all have an id
    pub fn from_courses(courses: Vec<Course>) -> Result<Self> {
        let mut id_index = HashMap::new();
        let mut idnumber_index = HashMap::new();
        for (i, course) in courses.iter().enumerate() {
            let id = course.id().ok_or_else(|| Error::MissingAttribute {
                course: None,
                field: "id".to_string(),
            })?;
            id_index.insert(id, i);
            if let Some(idnumber) = course.idnumber() {
                idnumber_index.insert(idnumber, i);
            }
        }

        Ok(CourseList {
            courses,
            id_index,
            idnumber_index,
        })
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Course> {
        self.courses.iter()
    }

    /// The course at `index`, in the order moodle listed them
    pub fn item(&self, index: usize) -> Result<&Course> {
        self.courses.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.courses.len(),
        })
    }

    pub fn by_id(&self, id: i64) -> Option<&Course> {
        self.id_index.get(&id).map(|i| &self.courses[*i])
    }

    pub fn by_idnumber(&self, idnumber: &str) -> Option<&Course> {
        self.idnumber_index.get(idnumber).map(|i| &self.courses[*i])
    }

    /// Update several courses in one call, sending only `fields` (plus `id`) of each.
    ///
    /// The courses don't have to come from a list; any course with an id will do.
    pub fn bulk_update(
        client: &Client,
        courses: &[&Course],
        fields: &[&str],
    ) -> Result<Value> {
        let mut fields = fields.to_vec();
        if !fields.contains(&"id") {
            fields.push("id");
        }

        let courses = courses
            .iter()
            .map(|c| c.project(&fields))
            .collect::<Result<Vec<_>>>()?;

        client.call(UPDATE_COURSES, json!({ "courses": courses }))
    }
}

impl<'a> IntoIterator for &'a CourseList {
    type Item = &'a Course;
    type IntoIter = std::slice::Iter<'a, Course>;

    fn into_iter(self) -> Self::IntoIter {
        self.courses.iter()
    }
}

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use log::info;
use moodle_client::{Client, Course, CourseList};
use serde_json::{Map, Value};

/// Fields to set on a course
#[derive(Args, Debug, Default)]
pub struct Fields {
    /// Set a field, as FIELD=VALUE. Values are read as JSON if they parse, else as text
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    set: Vec<String>,

    /// Set one language of a multilingual field, as FIELD.LANG=TEXT
    #[arg(long = "i18n", value_name = "FIELD.LANG=TEXT")]
    i18n: Vec<String>,
}

impl Fields {
    /// Apply to `course`, returning the names of every field touched
    fn apply(&self, course: &mut Course) -> Result<Vec<String>> {
        let mut touched = Vec::new();

        for arg in &self.set {
            let (field, value) = split(arg, '=')?;
            course.set(field, parse_value(value));
            touched.push(field.to_string());
        }

        let mut texts: Map<String, Value> = Map::new();
        for arg in &self.i18n {
            let (path, text) = split(arg, '=')?;
            let (field, lang) = split(path, '.')?;
            let langs = texts
                .entry(field.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(langs) = langs {
                langs.insert(lang.to_string(), Value::String(text.to_string()));
            }
        }
        touched.extend(texts.keys().cloned());
        course.i18n_set(texts);

        Ok(touched)
    }
}

fn split(arg: &str, sep: char) -> Result<(&str, &str)> {
    arg.split_once(sep)
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("expected something like KEY{}VALUE, got {:?}", sep, arg))
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn text_attr<'a>(course: &'a Course, field: &str) -> &'a str {
    course.get(field).and_then(Value::as_str).unwrap_or("")
}

pub fn list(client: &Client) -> Result<()> {
    let courses = client.courses().context("error listing courses")?;
    for course in &courses {
        println!(
            "{}\t{}\t{}\t{}",
            course.id().unwrap_or_default(),
            course.idnumber().unwrap_or_default(),
            text_attr(course, "shortname"),
            text_attr(course, "fullname"),
        );
    }
    info!("{} courses", courses.len());

    Ok(())
}

pub fn show(client: &Client, id: Option<i64>, idnumber: Option<String>) -> Result<()> {
    let courses = client.courses().context("error listing courses")?;
    let course = match (id, idnumber) {
        (Some(id), _) => courses.by_id(id),
        (None, Some(idnumber)) => courses.by_idnumber(&idnumber),
        (None, None) => bail!("give either an id or an idnumber"),
    };
    let Some(course) = course else {
        bail!("no such course");
    };

    println!("{}", serde_json::to_string_pretty(course)?);
    Ok(())
}

pub fn call(client: &Client, function: &str, args: &str) -> Result<()> {
    let args: Value = serde_json::from_str(args).context("arguments aren't valid JSON")?;
    let result = client.call(function, args)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn create(client: &Client, fields: Fields) -> Result<()> {
    let mut course = Course::new();
    fields.apply(&mut course)?;
    course.create(client).context("error creating course")?;

    match course.id() {
        Some(id) => println!("{}", id),
        None => bail!("course was created, but moodle didn't say what its id is"),
    }
    Ok(())
}

pub fn update(client: &Client, id: i64, fields: Fields) -> Result<()> {
    let courses = client.courses().context("error listing courses")?;
    let mut course = courses
        .by_id(id)
        .cloned()
        .ok_or_else(|| anyhow!("no course with id {}", id))?;

    let touched = fields.apply(&mut course)?;
    if touched.is_empty() {
        bail!("nothing to update");
    }
    let touched: Vec<&str> = touched.iter().map(String::as_str).collect();

    let result = CourseList::bulk_update(client, &[&course], &touched)
        .context("error updating course")?;
    info!("update returned {}", result);

    Ok(())
}

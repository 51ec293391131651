pub mod config;
pub mod course;
pub mod params;

pub use config::{Config, Token};
pub use course::{Course, CourseList};
use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

const FIXED_FIELDS: [&str; 3] = ["wstoken", "moodlewsrestformat", "wsfunction"];

/// A client, for calling functions of Moodle's REST web service
pub struct Client {
    pub config: Config,
    http: Box<dyn Transport>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("error calling moodle function {}: {}", .function, describe_exception(.response))]
    RemoteApi { function: String, response: Value },

    #[error("http error: {}", .0)]
    Http(#[from] reqwest::Error),

    #[error("serde error: {}", .0)]
    Serde(#[from] serde_json::Error),

    #[error("course index {} out of range for {} courses", .index, .len)]
    OutOfRange { index: usize, len: usize },

    #[error("course {} has no attribute {}", display_id(.course), .field)]
    MissingAttribute { course: Option<i64>, field: String },

    #[error("missing configuration: {} is not set", .0)]
    MissingConfig(&'static str),

    #[error("{} returned something other than {}", .function, .expected)]
    UnexpectedResponse {
        function: String,
        expected: &'static str,
    },
}

fn describe_exception(response: &Value) -> String {
    ["exception", "errorcode", "message"]
        .iter()
        .filter_map(|k| response.get(k).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(": ")
}

fn display_id(id: &Option<i64>) -> String {
    id.map_or_else(|| "(no id)".to_string(), |id| id.to_string())
}

/// Sends a form to the REST server and decodes the JSON it returns
pub trait Transport: Send + Sync {
    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Value>;
}

impl Transport for reqwest::blocking::Client {
    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Value> {
        let resp = self.post(url).form(form).send()?.error_for_status()?;
        if log::log_enabled!(log::Level::Debug) {
            let s = resp.text()?;
            debug!("response: {}", s);
            Ok(serde_json::from_str(&s)?)
        } else {
            Ok(resp.json()?)
        }
    }
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, reqwest::blocking::Client::new())
    }

    /// Build a client from the environment, see [`Config::from_env`]
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Config::from_env()?))
    }

    pub fn with_transport(config: Config, http: impl Transport + 'static) -> Self {
        Client {
            config,
            http: Box::new(http),
        }
    }

    /// Call the web service function `function` with the given arguments.
    ///
    /// `args` is usually an object whose keys are the function's parameters, eg:
    /// `client.call("core_course_update_courses", json!({"courses": [{"id": 1, "fullname": "My favourite course"}]}))`
    pub fn call(&self, function: &str, args: Value) -> Result<Value> {
        let flat = params::rest_api_parameters(&args);
        debug!(
            "calling {} with {:?}",
            function,
            flat.keys().collect::<Vec<_>>()
        );

        // The fixed fields replace any argument of the same name
        let mut form: Vec<(String, String)> = flat
            .iter()
            .filter(|(k, _)| !FIXED_FIELDS.contains(&k.as_str()))
            .filter_map(|(k, v)| params::form_value(v).map(|v| (k.clone(), v)))
            .collect();
        form.push(("wstoken".to_string(), self.config.token.as_ref().to_string()));
        form.push(("moodlewsrestformat".to_string(), "json".to_string()));
        form.push(("wsfunction".to_string(), function.to_string()));

        let response = self.http.post_form(&self.config.endpoint(), &form)?;

        match response.get("exception") {
            Some(e) if params::is_truthy(e) => {
                warn!("{} raised {}", function, e);
                Err(Error::RemoteApi {
                    function: function.to_string(),
                    response,
                })
            }
            _ => Ok(response),
        }
    }

    /// Snapshot of every course on the site
    pub fn courses(&self) -> Result<CourseList> {
        CourseList::fetch(self)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::client;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_sends_auth_and_flat_args() {
        let (client, fake) = client();
        fake.respond(json!([]));

        client
            .call(
                "core_course_update_courses",
                json!({"courses": [{"id": 1, "visible": true, "summary": null}]}),
            )
            .unwrap();

        let req = fake.last();
        assert_eq!(
            req.url,
            "https://moodle.example.org/webservice/rest/server.php"
        );
        assert_eq!(req.param("wstoken"), Some("secret"));
        assert_eq!(req.param("moodlewsrestformat"), Some("json"));
        assert_eq!(req.param("wsfunction"), Some("core_course_update_courses"));
        assert_eq!(req.param("courses[0][id]"), Some("1"));
        assert_eq!(req.param("courses[0][visible]"), Some("1"));
        assert!(!req.has_param("courses[0][summary]"));
    }

    #[test]
    fn test_fixed_fields_win() {
        let (client, fake) = client();
        fake.respond(json!([]));

        client
            .call("real_function", json!({"wsfunction": "other", "wstoken": "x"}))
            .unwrap();

        let req = fake.last();
        assert_eq!(req.form.len(), 3);
        assert_eq!(req.param("wsfunction"), Some("real_function"));
        assert_eq!(req.param("wstoken"), Some("secret"));
    }

    #[test]
    fn test_call_returns_response_unchanged() {
        let (client, fake) = client();
        fake.respond(json!({"warnings": []}));
        fake.respond(json!(42));

        assert_eq!(
            client.call("f", json!({})).unwrap(),
            json!({"warnings": []})
        );
        assert_eq!(client.call("g", json!({})).unwrap(), json!(42));
    }

    #[test]
    fn test_remote_exception() {
        let (client, fake) = client();
        let body = json!({
            "exception": "invalid_parameter_exception",
            "errorcode": "invalidparameter",
            "message": "Invalid parameter value detected"
        });
        fake.respond(body.clone());

        match client.call("core_course_create_courses", json!({})) {
            Err(Error::RemoteApi { function, response }) => {
                assert_eq!(function, "core_course_create_courses");
                assert_eq!(response, body);
            }
            x => panic!("expected a remote error, got {:?}", x),
        }
    }

    #[test]
    fn test_falsy_exception_is_not_an_error() {
        let (client, fake) = client();
        fake.respond(json!({"exception": "", "id": 3}));
        assert!(client.call("f", json!({})).is_ok());
    }

    #[test]
    fn test_remote_error_display() {
        let err = Error::RemoteApi {
            function: "core_course_get_courses".to_string(),
            response: json!({"exception": "moodle_exception", "message": "Access denied"}),
        };
        assert_eq!(
            err.to_string(),
            "error calling moodle function core_course_get_courses: moodle_exception: Access denied"
        );
    }
}

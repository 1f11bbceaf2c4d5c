use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
    thread::sleep,
    time::{Duration as StdDuration, Instant},
};

use chrono::{Datelike, NaiveDateTime, Timelike, Utc};
use reqwest::{blocking::Client, StatusCode};

use super::{parse_status_page, split_span, RequestState, AUTH_URL, CONT_URL};
use crate::{errors::SeisDataErr, network::NetworkCode, win32};

/// A logged in session with the Hi-net service.
#[derive(Debug)]
pub struct HinetClient {
    client: Client,
    auth_url: String,
    cont_url: String,
    poll_interval: StdDuration,
    request_timeout: StdDuration,
}

/// The pieces of one downloaded ZIP archive.
#[derive(Debug, Default)]
struct Extracted {
    cnt_files: Vec<Vec<u8>>,
    ctable: Option<Vec<u8>>,
}

impl HinetClient {
    /// Connect and log in.
    pub fn login(user: &str, password: &str) -> Result<Self, SeisDataErr> {
        Self::login_at(AUTH_URL, CONT_URL, user, password)
    }

    /// Connect and log in to a service rooted somewhere else.
    pub fn login_at(
        auth_url: &str,
        cont_url: &str,
        user: &str,
        password: &str,
    ) -> Result<Self, SeisDataErr> {
        if user.is_empty() || password.is_empty() {
            return Err(SeisDataErr::LoginFailed);
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(StdDuration::from_secs(120))
            .build()?;

        // The first visit sets the session cookie.
        client.get(auth_url).send()?;

        let response = client
            .post(auth_url)
            .form(&[("auth_un", user), ("auth_pw", password)])
            .send()?;

        if !response.status().is_success() {
            return Err(SeisDataErr::RemoteService(format!(
                "login answered {}",
                response.status()
            )));
        }

        // A failed login shows the form again.
        if response.text()?.contains("auth_pw") {
            return Err(SeisDataErr::LoginFailed);
        }

        log::info!("logged in to {} as {}", auth_url, user);

        Ok(HinetClient {
            client,
            auth_url: auth_url.to_owned(),
            cont_url: cont_url.to_owned(),
            poll_interval: StdDuration::from_secs(2),
            request_timeout: StdDuration::from_secs(300),
        })
    }

    /// Set how often the status page is checked and how long to wait for a request.
    pub fn with_polling(self, interval_secs: u64, timeout_secs: u64) -> Self {
        HinetClient {
            poll_interval: StdDuration::from_secs(interval_secs.max(1)),
            request_timeout: StdDuration::from_secs(timeout_secs),
            ..self
        }
    }

    /// The page the session logged in to.
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Download `span_minutes` of continuous data starting at `start` (JST) for a network.
    ///
    /// Long spans are split into several requests and joined into a single WIN32 file named
    /// `data_name`, the channel table is saved as `ctable_name`. Both go in `outdir`, which is
    /// created if needed. When no names are given they are derived from the code and time.
    pub fn get_continuous_waveform(
        &self,
        code: &NetworkCode,
        start: &NaiveDateTime,
        span_minutes: u32,
        data_name: Option<&str>,
        ctable_name: Option<&str>,
        outdir: &Path,
    ) -> Result<(PathBuf, PathBuf), SeisDataErr> {
        if span_minutes == 0 {
            return Err(SeisDataErr::NotEnoughData);
        }

        let pieces = split_span(start, span_minutes, code.max_span_minutes());

        let mut cnt_files = vec![];
        let mut ctable = None;
        for (piece_start, piece_span) in pieces {
            log::debug!(
                "requesting {} minutes of {} from {}",
                piece_span,
                code,
                piece_start
            );

            let id = self.request(code, &piece_start, piece_span)?;
            let zipped = self.download(id)?;
            let extracted = extract_zip(&zipped)?;

            cnt_files.extend(extracted.cnt_files);
            if ctable.is_none() {
                ctable = extracted.ctable;
            }
        }

        if cnt_files.is_empty() {
            return Err(SeisDataErr::RemoteService(format!(
                "no waveform files returned for {}",
                code
            )));
        }
        let ctable = ctable.ok_or_else(|| {
            SeisDataErr::RemoteService(format!("no channel table returned for {}", code))
        })?;

        std::fs::create_dir_all(outdir)?;

        let data_path = outdir.join(match data_name {
            Some(name) => name.to_owned(),
            None => format!(
                "{}_{}_{}.cnt",
                code,
                start.format("%Y%m%d%H%M"),
                span_minutes
            ),
        });
        let ctable_path = outdir.join(match ctable_name {
            Some(name) => name.to_owned(),
            None => format!("{}_{}.ch", code, start.format("%Y%m%d")),
        });

        std::fs::write(&data_path, win32::concatenate(&cnt_files))?;
        std::fs::write(&ctable_path, ctable)?;

        Ok((data_path, ctable_path))
    }

    // Submit a request and wait for it to be ready, returns the request id.
    fn request(
        &self,
        code: &NetworkCode,
        start: &NaiveDateTime,
        span: u32,
    ) -> Result<u64, SeisDataErr> {
        let newest_before = self.status()?.iter().map(|row| row.id).max().unwrap_or(0);

        let params = [
            ("org1", code.org().to_owned()),
            ("org2", code.net().to_owned()),
            ("volc", "0".to_owned()),
            ("year", format!("{:04}", start.year())),
            ("month", format!("{:02}", start.month())),
            ("day", format!("{:02}", start.day())),
            ("hour", format!("{:02}", start.hour())),
            ("min", format!("{:02}", start.minute())),
            ("span", span.to_string()),
            ("arc", "ZIP".to_owned()),
            ("LANG", "en".to_owned()),
            ("rn", Utc::now().timestamp().to_string()),
        ];

        let response = self
            .client
            .get(&format!("{}cont_request.php", self.cont_url))
            .query(&params)
            .send()?;

        if !response.status().is_success() {
            return Err(SeisDataErr::RemoteService(format!(
                "request for {} answered {}",
                code,
                response.status()
            )));
        }

        let began = Instant::now();
        loop {
            let newest = self
                .status()?
                .into_iter()
                .filter(|row| row.id > newest_before)
                .min_by_key(|row| row.id);

            match newest {
                Some(row) if row.state == RequestState::Ready => return Ok(row.id),
                Some(row) if row.state == RequestState::Failed => {
                    return Err(SeisDataErr::RemoteService(format!(
                        "request {} for {} failed",
                        row.id, code
                    )))
                }
                _ => {}
            }

            if began.elapsed() > self.request_timeout {
                return Err(SeisDataErr::RequestTimeout(format!(
                    "{} minutes of {} from {}",
                    span, code, start
                )));
            }

            sleep(self.poll_interval);
        }
    }

    fn status(&self) -> Result<Vec<super::RequestStatus>, SeisDataErr> {
        let text = self
            .client
            .get(&format!("{}cont_status.php", self.cont_url))
            .send()?
            .text()?;

        Ok(parse_status_page(&text))
    }

    fn download(&self, id: u64) -> Result<Vec<u8>, SeisDataErr> {
        let mut response = self
            .client
            .get(&format!("{}cont_download.php", self.cont_url))
            .query(&[("id", id.to_string())])
            .send()?;

        match response.status() {
            StatusCode::OK => {
                let mut buffer = vec![];
                response.read_to_end(&mut buffer)?;
                Ok(buffer)
            }
            code => Err(SeisDataErr::RemoteService(format!(
                "download of request {} answered {}",
                id, code
            ))),
        }
    }
}

fn extract_zip(bytes: &[u8]) -> Result<Extracted, SeisDataErr> {
    if !bytes.starts_with(b"PK") {
        return Err(SeisDataErr::RemoteService(
            "download is not a zip archive".to_owned(),
        ));
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut named_cnt = vec![];
    let mut extracted = Extracted::default();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if !file.is_file() {
            continue;
        }

        let name = file.name().to_owned();
        let mut contents = vec![];
        file.read_to_end(&mut contents)?;

        if name.ends_with(".cnt") {
            named_cnt.push((name, contents));
        } else if name.ends_with(".ch") {
            extracted.ctable = Some(contents);
        } else {
            log::debug!("ignoring {} in archive", name);
        }
    }

    named_cnt.sort_by(|a, b| a.0.cmp(&b.0));
    extracted.cnt_files = named_cnt.into_iter().map(|(_, data)| data).collect();

    Ok(extracted)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/

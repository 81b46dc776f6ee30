//! Server-rendered pages.
//!
//! Pages are plain HTML assembled from string templates; the interactive bits
//! (photo upload, request submission, deletion) call the JSON endpoints from a
//! few lines of inline script. All user-supplied text goes through
//! [`escape`] before it is interpolated.

use axum::response::Html;

use crate::geo::{GeoPoint, RankedFacility};
use crate::model::{FacilityKind, HelpRequest};

/// An error banner rendered above the page body.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Escape text for safe inclusion in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const LAYOUT: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{title} | SnakeSafe</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; color: #1d2a1d; background: #f6f8f4; }
    nav { display: flex; gap: 1rem; padding: .75rem 1.5rem; background: #2f5d34; }
    nav a { color: #fff; text-decoration: none; }
    main { max-width: 60rem; margin: 1.5rem auto; padding: 0 1rem; }
    table { width: 100%; border-collapse: collapse; }
    th, td { text-align: left; padding: .4rem .5rem; border-bottom: 1px solid #d6ddd2; }
    .notice { padding: .75rem 1rem; border-radius: .25rem; margin-bottom: 1rem; }
    .notice.danger { background: #f6d5d5; }
    form.card, section.card { background: #fff; padding: 1rem; border-radius: .25rem; margin-bottom: 1rem; }
    label { display: block; margin-top: .5rem; }
  </style>
</head>
<body>
  <nav>
    <a href="/">SnakeSafe</a>
    <a href="/snakebite">Hospitals</a>
    <a href="/rescue">Rescuers</a>
    <a href="/info">Safety info</a>
    <a href="/dashboard">Dashboard</a>
  </nav>
  <main>
    {notice}
    {body}
  </main>
</body>
</html>
"#;

fn layout(title: &str, notice: Option<&Notice>, body: &str) -> Html<String> {
    let notice = notice
        .map(|n| format!(r#"<div class="notice danger">{}</div>"#, escape(&n.message)))
        .unwrap_or_default();

    Html(
        LAYOUT
            .replace("{title}", &escape(title))
            .replace("{notice}", &notice)
            .replace("{body}", body),
    )
}

const INDEX_BODY: &str = r#"
<h1>Identify a snake</h1>
<form class="card" id="predict-form">
  <label>Photo <input type="file" name="snakeImage" accept="image/*" required /></label>
  <button type="submit">Identify</button>
  <div id="prediction"></div>
</form>

<h2>Ask for help</h2>
<form class="card" id="request-form">
  <label>Type
    <select name="request_type">
      <option value="hospital">Hospital</option>
      <option value="rescue">Snake rescue</option>
    </select>
  </label>
  <label>Name <input name="name" required /></label>
  <label>Phone <input name="phone" required /></label>
  <label>Species, if known <input name="snakeSpecies" /></label>
  <label>Location <input name="location" placeholder="Town or lat,lon" /></label>
  <input type="hidden" name="latitude" />
  <input type="hidden" name="longitude" />
  <button type="submit">Send request</button>
  <div id="request-result"></div>
</form>

<script>
  const show = (el, text) => { document.getElementById(el).textContent = text; };
  navigator.geolocation && navigator.geolocation.getCurrentPosition((pos) => {
    const form = document.getElementById('request-form');
    form.latitude.value = pos.coords.latitude;
    form.longitude.value = pos.coords.longitude;
  });
  document.getElementById('predict-form').addEventListener('submit', async (e) => {
    e.preventDefault();
    const res = await fetch('/predict', { method: 'POST', body: new FormData(e.target) });
    const data = await res.json();
    show('prediction', data.error ? data.error :
      `${data.common_name} (${data.species}), ${data.confidence.toFixed(1)}%. ` +
      `${data.nepali_name}. ${data.danger}. Habitat: ${data.habitat}.`);
  });
  document.getElementById('request-form').addEventListener('submit', async (e) => {
    e.preventDefault();
    const res = await fetch('/submit_request', {
      method: 'POST', body: new FormData(e.target),
    });
    const data = await res.json();
    show('request-result', data.error ? data.error : data.message);
  });
</script>
"#;

pub fn index() -> Html<String> {
    layout("Home", None, INDEX_BODY)
}

const INFO_BODY: &str = r#"
<h1>Snakebite first aid</h1>
<section class="card">
  <ul>
    <li>Stay calm and keep the bitten limb still, at or below heart level.</li>
    <li>Remove rings, watches and tight clothing near the bite.</li>
    <li>Do not cut, suck, or apply ice or a tight tourniquet.</li>
    <li>Go to the nearest hospital with antivenom as quickly as possible.</li>
    <li>Note the time of the bite and, if it is safe, take a photo of the snake.</li>
  </ul>
</section>
<section class="card">
  <p>Most snakes in Nepal are not venomous. Kraits, cobras, Russell's vipers and
  pit vipers are the medically important species. Call a trained rescuer rather
  than trying to catch or kill a snake yourself.</p>
</section>
"#;

pub fn info() -> Html<String> {
    layout("Safety info", None, INFO_BODY)
}

/// Ranked list of hospitals or rescuers around `origin`.
pub fn facilities(
    kind: FacilityKind,
    ranked: &[RankedFacility],
    origin: GeoPoint,
    notice: Option<&Notice>,
) -> Html<String> {
    let (title, path) = match kind {
        FacilityKind::Hospital => ("Nearest hospitals", "/snakebite"),
        FacilityKind::Rescuer => ("Nearest snake rescuers", "/rescue"),
    };

    let mut body = format!(
        r#"<h1>{title}</h1>
<p>Distances from {lat:.4}, {lon:.4}. <a href="{path}" id="locate">Use my location</a></p>
<table>
  <thead><tr><th>Name</th><th>Phone</th><th>Distance</th><th>Map</th></tr></thead>
  <tbody>
"#,
        lat = origin.latitude,
        lon = origin.longitude,
    );

    if ranked.is_empty() {
        body.push_str(&format!(
            "    <tr><td colspan=\"4\">No {} found.</td></tr>\n",
            kind.plural()
        ));
    }

    for entry in ranked {
        let f = &entry.facility;
        body.push_str(&format!(
            r#"    <tr><td>{name}</td><td><a href="tel:{phone}">{phone}</a></td><td>{distance:.1} km</td><td><a href="https://www.openstreetmap.org/?mlat={lat}&amp;mlon={lon}#map=14/{lat}/{lon}">map</a></td></tr>
"#,
            name = escape(&f.name),
            phone = escape(&f.phone),
            distance = entry.distance,
            lat = f.latitude,
            lon = f.longitude,
        ));
    }

    body.push_str(&format!(
        r#"  </tbody>
</table>
<script>
  document.getElementById('locate').addEventListener('click', (e) => {{
    if (!navigator.geolocation) return;
    e.preventDefault();
    navigator.geolocation.getCurrentPosition((pos) => {{
      window.location = `{path}?lat=${{pos.coords.latitude}}&lon=${{pos.coords.longitude}}`;
    }});
  }});
</script>
"#
    ));

    layout(title, notice, &body)
}

/// Operator view of every help request.
pub fn dashboard(operator: &str, requests: &[HelpRequest], notice: Option<&Notice>) -> Html<String> {
    let mut body = format!(
        r#"<h1>Help requests</h1>
<p>Signed in as {operator}. <a href="/logout">Log out</a></p>
<table>
  <thead><tr><th>Time (NPT)</th><th>Type</th><th>Name</th><th>Phone</th><th>Species</th><th>Location</th><th></th></tr></thead>
  <tbody>
"#,
        operator = escape(operator),
    );

    if requests.is_empty() {
        body.push_str("    <tr><td colspan=\"7\">No requests.</td></tr>\n");
    }

    for request in requests {
        let location = match (request.latitude, request.longitude) {
            (Some(lat), Some(lon)) => format!(
                r#"{} (<a href="https://www.openstreetmap.org/?mlat={lat}&amp;mlon={lon}">{lat:.4}, {lon:.4}</a>)"#,
                escape(&request.location)
            ),
            _ => escape(&request.location),
        };

        body.push_str(&format!(
            r#"    <tr id="request-{id}"><td>{time}</td><td>{kind}</td><td>{name}</td><td><a href="tel:{phone}">{phone}</a></td><td>{species}</td><td>{location}</td><td><button data-id="{id}" class="delete">Delete</button></td></tr>
"#,
            id = request.id,
            time = request.local_timestamp(),
            kind = request.request_type,
            name = escape(&request.name),
            phone = escape(&request.phone),
            species = escape(&request.snake_species),
        ));
    }

    body.push_str(
        r#"  </tbody>
</table>
<script>
  document.querySelectorAll('button.delete').forEach((btn) => {
    btn.addEventListener('click', async () => {
      if (!confirm('Delete this request?')) return;
      const res = await fetch(`/delete_request/${btn.dataset.id}`, { method: 'POST' });
      const data = await res.json();
      if (data.success) document.getElementById(`request-${btn.dataset.id}`).remove();
      else alert(data.error);
    });
  });
</script>
"#,
    );

    layout("Dashboard", notice, &body)
}

const LOGIN_BODY: &str = r#"
<h1>Operator login</h1>
<form class="card" method="post" action="/login">
  <label>Username <input name="username" autocomplete="username" required /></label>
  <label>Password <input name="password" type="password" autocomplete="current-password" required /></label>
  <button type="submit">Log in</button>
</form>
"#;

pub fn login(notice: Option<&Notice>) -> Html<String> {
    layout("Login", notice, LOGIN_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{KATHMANDU, rank_by_distance};
    use crate::model::{Facility, RequestType};
    use chrono::Utc;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#x27;y&#x27;&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("बाघ सर्प"), "बाघ सर्प");
    }

    #[test]
    fn test_facilities_page_lists_in_order() {
        let ranked = rank_by_distance(
            KATHMANDU,
            vec![
                Facility {
                    id: 1,
                    name: "Bheri Hospital".to_string(),
                    phone: "+977-81-520188".to_string(),
                    latitude: 28.0530,
                    longitude: 81.6170,
                },
                Facility {
                    id: 2,
                    name: "Bir Hospital".to_string(),
                    phone: "+977-1-4221119".to_string(),
                    latitude: 27.7060,
                    longitude: 85.3150,
                },
            ],
        );

        let Html(page) = facilities(FacilityKind::Hospital, &ranked, KATHMANDU, None);

        let bir = page.find("Bir Hospital").unwrap();
        let bheri = page.find("Bheri Hospital").unwrap();
        assert!(bir < bheri);
        assert!(page.contains("Nearest hospitals"));
    }

    #[test]
    fn test_facilities_page_empty_with_notice() {
        let notice = Notice::danger("An error occurred while loading rescuers.");
        let Html(page) = facilities(FacilityKind::Rescuer, &[], KATHMANDU, Some(&notice));
        assert!(page.contains("No rescuers found."));
        assert!(page.contains("notice danger"));
    }

    #[test]
    fn test_dashboard_escapes_user_input() {
        let request = HelpRequest {
            id: 3,
            name: "<b>Mallory</b>".to_string(),
            phone: "9800000000".to_string(),
            snake_species: "Unknown".to_string(),
            location: "Not specified".to_string(),
            request_type: RequestType::Rescue,
            latitude: None,
            longitude: None,
            timestamp: Utc::now(),
        };

        let Html(page) = dashboard("admin", &[request], None);

        assert!(page.contains("&lt;b&gt;Mallory&lt;/b&gt;"));
        assert!(!page.contains("<b>Mallory</b>"));
        assert!(page.contains(r#"id="request-3""#));
    }
}

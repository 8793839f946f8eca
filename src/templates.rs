//! Literal blocks emitted by the rewriter
//!
//! Every block is stored exactly as it lands in the output document, one
//! `\n`-terminated line per source line. The client block is the only one
//! with substitution slots (`{url}` and `{token}`).

/// Opening tag of the embedded module script.
pub const SCRIPT_START_MARKER: &str = r#"<script type="module">"#;

/// First line kept after the replaced client configuration.
pub const DATA_STORE_MARKER: &str = "// --- DATA STORE ---";

/// Header of the Supabase sync functions that get replaced.
pub const SUPABASE_SYNC_MARKER: &str = "// --- SUPABASE SYNC ---";

/// Call that boots the old backend.
pub const SUPABASE_INIT_CALL: &str = "initSupabase();";

/// Identifier of the optional session variable the Turso variant no longer needs.
pub const SUPABASE_USER_IDENT: &str = "supabaseUser";

/// Initializer clause removed from the variable declaration line.
pub const SUPABASE_USER_CLAUSE: &str = ", supabaseUser = null";

/// User id field assigned to the session variable at login.
pub const USER_ID_FIELD: &str = "user.id";

/// Loading text shown while the old backend connects.
pub const CONNECTING_TEXT: &str = "CONNECTING...";

/// Replacement for the loading text line.
pub const LOADING_LINE: &str = "    <p class=\"font-bold tracking-widest\">LOADING...</p>\n";

/// Client declaration inserted right after the module script tag.
pub const CLIENT_BLOCK_TEMPLATE: &str = "\
import { createClient } from 'https://cdn.jsdelivr.net/npm/@libsql/client-web@0.4.0/+esm';

// --- TURSO CONFIGURATION ---
const tursoUrl = '{url}';
const tursoToken = '{token}';

const turso = createClient({
    url: tursoUrl,
    authToken: tursoToken,
});

";

/// Turso sync functions replacing the Supabase sync section.
///
/// Ends with the `initTurso();` call so the app boots as soon as the module runs.
pub const SYNC_BLOCK: &str = "\
// --- TURSO SYNC ---
async function initTurso() {
    try {
        // Create table if not exists
        await turso.execute(`
            CREATE TABLE IF NOT EXISTS app_data (
                id TEXT PRIMARY KEY,
                data TEXT,
                updated_at TEXT
            )
        `);

        // Try to load data from Turso
        const result = await turso.execute({
            sql: 'SELECT data FROM app_data WHERE id = ?',
            args: ['master_record']
        });

        if (result.rows.length > 0 && result.rows[0].data) {
            const savedData = JSON.parse(result.rows[0].data);
            db = savedData;
            ['activities','activitySubmissions','modules','exams','examSubmissions','globalEvents'].forEach(k=>{
                if(!db[k]) db[k] = (k==='activitySubmissions'||k==='examSubmissions') ? {} : [];
            });
            if(!db.theme) db.theme = defaultData.theme;
        } else {
            // Initialize with default data
            console.log(\"Initializing with default data\");
            await saveDB();
        }

        applyTheme();

        const l = $('loading-screen');
        if(l) {
            l.style.opacity=0;
            setTimeout(() => l.remove(), 500);
            $('app').classList.remove('opacity-0');
        }

        if(!currentUser) render();
    } catch (e) {
        console.error(\"Turso Init Error:\", e);
        // If Turso is not available, fall back to local mode
        const l = $('loading-screen');
        if(l) {
            l.style.opacity=0;
            setTimeout(() => l.remove(), 500);
            $('app').classList.remove('opacity-0');
        }
        if(!currentUser) render();
    }
}

async function saveDB() {
    try {
        const dataJson = JSON.stringify(db);
        const now = new Date().toISOString();

        await turso.execute({
            sql: `
                INSERT INTO app_data (id, data, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at
            `,
            args: ['master_record', dataJson, now]
        });

        // Show sync indicator
        const status = $('sync-status');
        if(status) {
            status.style.opacity = '1';
            setTimeout(() => status.style.opacity = '0', 2000);
        }
    } catch (e) {
        console.error(\"Save Error:\", e);
        showToast('Failed to save data: ' + e.message, 'error');
    }
}

initTurso();
";

/// Render the client block for the given connection settings.
///
/// Slots are filled in a single scan of the template, so slot-like text
/// inside a value is never substituted again.
pub fn render_client_block(url: &str, token: &str) -> String {
    let mut rendered = String::with_capacity(CLIENT_BLOCK_TEMPLATE.len() + url.len() + token.len());
    let mut rest = CLIENT_BLOCK_TEMPLATE;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{url}") {
            rendered.push_str(url);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{token}") {
            rendered.push_str(token);
            rest = after;
        } else {
            rendered.push('{');
            rest = &tail[1..];
        }
    }
    rendered.push_str(rest);

    rendered
}

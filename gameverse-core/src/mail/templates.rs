//! HTML 邮件模板

use super::{MailKind, OutgoingMail};

const STYLE: &str = "body{font-family:Arial,sans-serif;background:#0e0f10;color:#fff;margin:0}\
.box{max-width:600px;margin:40px auto;background:#1c1e22;border-radius:12px;border:1px solid #2a2f35}\
.head{padding:32px 20px;text-align:center}.body{padding:32px 30px;color:#d1d5db;line-height:1.6}\
.btn{display:inline-block;background:#3b82f6;color:#fff;text-decoration:none;padding:14px 32px;border-radius:8px;font-weight:bold}\
.foot{padding:20px 30px;background:#15171a;text-align:center;color:#6b7280;font-size:12px}";

fn page(header: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><style>{STYLE}</style></head>\
<body><div class=\"box\"><div class=\"head\"><h1>{header}</h1></div>\
<div class=\"body\">{content}</div>\
<div class=\"foot\"><p>GameVerse. Cet email a été envoyé automatiquement, merci de ne pas y répondre.</p></div>\
</div></body></html>"
    )
}

/// Minimal HTML escaping for user-controlled values.
fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 验证邮件：包含 24 小时内有效的激活链接
pub fn verification_email(to: &str, username: &str, verification_url: &str) -> OutgoingMail {
    let username = escape(username);
    let url = escape(verification_url);
    let content = format!(
        "<h2>Bienvenue {username} !</h2>\
<p>Merci de vous être inscrit sur GameVerse. Vérifiez votre adresse email pour activer votre compte.</p>\
<p style=\"text-align:center\"><a class=\"btn\" href=\"{url}\">Vérifier mon email</a></p>\
<p>Ou copiez ce lien dans votre navigateur :</p><p style=\"word-break:break-all\">{url}</p>\
<p><strong>Important :</strong> ce lien expire dans 24 heures.</p>\
<p>Si vous n'avez pas créé de compte sur GameVerse, ignorez cet email.</p>"
    );
    OutgoingMail {
        kind: MailKind::Verification,
        to: to.to_string(),
        subject: "Vérifiez votre compte GameVerse".to_string(),
        html: page("GameVerse", &content),
    }
}

pub fn welcome_email(to: &str, username: &str) -> OutgoingMail {
    let username = escape(username);
    let content = format!(
        "<h2>Félicitations {username} !</h2>\
<p>Votre compte GameVerse est maintenant activé.</p>\
<ul><li>Bibliothèque personnelle : ajoutez vos jeux favoris.</li>\
<li>Recherche avancée : explorez le catalogue avec des filtres.</li>\
<li>Classements : découvrez les jeux les plus populaires.</li></ul>\
<p>Bonne exploration sur GameVerse !</p>"
    );
    OutgoingMail {
        kind: MailKind::Welcome,
        to: to.to_string(),
        subject: "Bienvenue sur GameVerse !".to_string(),
        html: page("Compte vérifié !", &content),
    }
}

//! App name to package name mapping for commonly requested applications.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Mapping from lower-cased app display names to Android package names.
pub static APP_PACKAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // Music & Video
    m.insert("spotify", "com.spotify.music");
    m.insert("youtube", "com.google.android.youtube");
    m.insert("youtube music", "com.google.android.apps.youtube.music");
    m.insert("netflix", "com.netflix.mediaclient");

    // Messaging & Social
    m.insert("whatsapp", "com.whatsapp");
    m.insert("telegram", "org.telegram.messenger");
    m.insert("messages", "com.google.android.apps.messaging");
    m.insert("gmail", "com.google.android.gm");
    m.insert("instagram", "com.instagram.android");
    m.insert("x", "com.twitter.android");
    m.insert("wechat", "com.tencent.mm");

    // Maps & Travel
    m.insert("google maps", "com.google.android.apps.maps");
    m.insert("maps", "com.google.android.apps.maps");
    m.insert("uber", "com.ubercab");

    // Shopping
    m.insert("amazon", "com.amazon.mShop.android.shopping");

    // System
    m.insert("settings", "com.android.settings");
    m.insert("chrome", "com.android.chrome");
    m.insert("camera", "com.android.camera2");
    m.insert("clock", "com.google.android.deskclock");
    m.insert("calendar", "com.google.android.calendar");
    m.insert("contacts", "com.google.android.contacts");
    m.insert("phone", "com.google.android.dialer");
    m.insert("photos", "com.google.android.apps.photos");
    m.insert("files", "com.google.android.documentsui");
    m.insert("play store", "com.android.vending");

    m
});

/// Look up a well-known package by app name, ignoring case and surrounding spaces.
pub fn known_package(app_name: &str) -> Option<&'static str> {
    APP_PACKAGES
        .get(app_name.trim().to_lowercase().as_str())
        .copied()
}

/// Effect names in table order. Each is stored in the WAD as `DS<NAME>`.
pub const SFX_NAMES: &[&str] = &[
    "pistol", "shotgn", "sgcock", "dshtgn", "dbopn", "dbcls", "dbload", "plasma", "bfg", "sawup",
    "sawidl", "sawful", "sawhit", "rlaunc", "rxplod", "firsht", "firxpl", "pstart", "pstop",
    "doropn", "dorcls", "stnmov", "swtchn", "swtchx", "plpain", "dmpain", "popain", "vipain",
    "mnpain", "pepain", "slop", "itemup", "wpnup", "oof", "telept", "posit1", "posit2", "posit3",
    "bgsit1", "bgsit2", "sgtsit", "cacsit", "brssit", "cybsit", "spisit", "bspsit", "kntsit",
    "vilsit", "mansit", "pesit", "sklatk", "sgtatk", "skepch", "vilatk", "claw", "skeswg",
    "pldeth", "pdiehi", "podth1", "podth2", "podth3", "bgdth1", "bgdth2", "sgtdth", "cacdth",
    "skldth", "brsdth", "cybdth", "spidth", "bspdth", "vildth", "kntdth", "pedth", "skedth",
    "posact", "bgact", "dmact", "bspact", "bspwlk", "vilact", "noway", "barexp", "punch", "hoof",
    "metal", "chgun", "tink", "bdopn", "bdcls", "itmbk", "flame", "flamst", "getpow", "bospit",
    "boscub", "bossit", "bospn", "bosdth", "manatk", "mandth", "sssit", "ssdth", "keenpn",
    "keendt", "skeact", "skesit", "skeatk", "radio",
];
